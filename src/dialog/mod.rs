//! Dialog understanding and decision making.
//!
//! Submodules:
//! - `types`: snapshots, decisions, and the dialog-kind taxonomy
//! - `context`: accessibility elements to `DialogSnapshot`
//! - `dedup`: suppression of re-observed dialogs
//! - `strategy`: the strategy capability and the ordered set
//! - `patterns`: shape-matched strategies for assistant approval dialogs
//! - `app_rules`: per-application decision tables
//! - `rules`: the deterministic terminal fallback
//! - `resolver`: orchestration across strategies, generation, and rules

pub mod app_rules;
pub mod context;
pub mod dedup;
pub mod patterns;
pub mod resolver;
pub mod rules;
pub mod strategy;
pub mod types;

// Re-exports for convenience
pub use app_rules::builtin_strategies;
pub use context::ContextBuilder;
pub use dedup::{DedupKey, DedupVerdict, Deduplicator};
pub use patterns::{AutoEditStrategy, CommandApprovalStrategy};
pub use resolver::{DecisionResolver, ResolvedDecision, ResolvedVia};
pub use rules::RuleBasedDefault;
pub use strategy::{DecisionStrategy, StrategySet};
pub use types::{Decision, DialogKind, DialogSnapshot, UiElement};
