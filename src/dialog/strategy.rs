//! The decision-strategy capability and the ordered set that evaluates it.
//!
//! Strategies are consulted strictly in registration order. The first one
//! that recognizes a dialog *and* produces a decision wins; recognizing a
//! dialog without deciding on it hands the dialog to the next strategy.

use crate::dialog::types::{Decision, DialogSnapshot};

/// A single decision rule, scoped to an application or a dialog pattern.
///
/// Implementations are stateless per decision; any configuration (keyword
/// lists, toggles) is fixed at construction.
pub trait DecisionStrategy: Send + Sync {
    /// Stable identifier used in logs and events.
    fn name(&self) -> &'static str;

    /// Whether this strategy recognizes the dialog at all.
    fn can_handle(&self, dialog: &DialogSnapshot) -> bool;

    /// Produces a decision, or nothing to let the next strategy try.
    fn decide(&self, dialog: &DialogSnapshot) -> Option<Decision>;
}

// ─── Strategy Set ───────────────────────────────────────────────────────────

/// An ordered collection of strategies with first-decision-wins semantics.
pub struct StrategySet {
    strategies: Vec<Box<dyn DecisionStrategy>>,
}

impl StrategySet {
    pub fn new(strategies: Vec<Box<dyn DecisionStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Runs the dialog through the strategies in order and returns the first
    /// decision together with the name of the strategy that produced it.
    pub fn evaluate(&self, dialog: &DialogSnapshot) -> Option<(&'static str, Decision)> {
        for strategy in &self.strategies {
            if !strategy.can_handle(dialog) {
                continue;
            }
            tracing::debug!(
                strategy = strategy.name(),
                app = %dialog.source_app,
                "strategy engaged"
            );
            match strategy.decide(dialog) {
                Some(decision) => return Some((strategy.name(), decision)),
                None => {
                    tracing::debug!(
                        strategy = strategy.name(),
                        "strategy yielded, trying next"
                    );
                }
            }
        }
        None
    }
}

// ─── Matching Helpers ───────────────────────────────────────────────────────

/// Case-insensitive keyword test. Keywords shorter than four characters are
/// matched as whole words so "no" cannot fire on "Notes" or "Ignore";
/// longer keywords use plain containment.
pub(crate) fn contains_keyword(text: &str, keyword: &str) -> bool {
    let text = text.to_lowercase();
    let keyword = keyword.to_lowercase();
    if keyword.chars().count() >= 4 {
        return text.contains(&keyword);
    }
    text.split(|c: char| !c.is_alphanumeric())
        .any(|token| token == keyword)
}

/// First option containing any of the given keywords.
pub(crate) fn find_option<'a>(options: &'a [String], any_of: &[&str]) -> Option<&'a str> {
    options
        .iter()
        .find(|option| any_of.iter().any(|k| contains_keyword(option, k)))
        .map(String::as_str)
}

/// First option containing any of `any_of` while containing none of
/// `none_of`. Lets "Save" win over "Don't Save" and "Yes" over
/// "Yes, don't ask again".
pub(crate) fn find_option_excluding<'a>(
    options: &'a [String],
    any_of: &[&str],
    none_of: &[&str],
) -> Option<&'a str> {
    options
        .iter()
        .find(|option| {
            any_of.iter().any(|k| contains_keyword(option, k))
                && !none_of.iter().any(|k| contains_keyword(option, k))
        })
        .map(String::as_str)
}

// ─── Tests ──────────────────────────────────────────────────────────────────
