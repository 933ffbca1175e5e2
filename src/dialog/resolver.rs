//! Orchestrates a single dialog through the resolution paths.
//!
//! Order is fixed: pattern and per-application strategies, then
//! generation-backed reasoning (only when some backend is available), then
//! the deterministic rule default. The first path to produce a decision
//! wins. Free-text prompts skip choice generation and, when they read as a
//! question, get an unconstrained generated answer that is always flagged
//! for user confirmation.

use std::fmt;
use std::sync::Arc;

use crate::config::AppsConfig;
use crate::dialog::rules::RuleBasedDefault;
use crate::dialog::strategy::{DecisionStrategy, StrategySet};
use crate::dialog::types::{Decision, DialogSnapshot};
use crate::llm::fallback::FallbackCoordinator;
use crate::llm::types::ProviderKind;

/// Guidance sent with every generation request.
const SYSTEM_PROMPT: &str = "You are a desktop automation assistant responding \
to application dialogs on the user's behalf. Prefer the least destructive \
action: saving work beats discarding it, and cancelling beats deleting. When \
uncertain, pick the option that keeps the user's data safe.";

/// Confidence assigned to generated free-text answers.
const QUESTION_CONFIDENCE: f32 = 0.7;

// ─── Resolution Outcome ─────────────────────────────────────────────────────

/// Which path produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedVia {
    Strategy(&'static str),
    Backend(ProviderKind),
    RuleDefault,
}

impl fmt::Display for ResolvedVia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedVia::Strategy(name) => write!(f, "strategy:{name}"),
            ResolvedVia::Backend(kind) => write!(f, "backend:{kind}"),
            ResolvedVia::RuleDefault => f.write_str("rule_default"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedDecision {
    pub decision: Decision,
    pub via: ResolvedVia,
}

// ─── Resolver ───────────────────────────────────────────────────────────────

pub struct DecisionResolver {
    strategies: StrategySet,
    coordinator: Arc<FallbackCoordinator>,
    terminal: RuleBasedDefault,
    apps: AppsConfig,
}

impl DecisionResolver {
    pub fn new(
        strategies: StrategySet,
        coordinator: Arc<FallbackCoordinator>,
        terminal: RuleBasedDefault,
        apps: AppsConfig,
    ) -> Self {
        Self {
            strategies,
            coordinator,
            terminal,
            apps,
        }
    }

    /// Resolves one dialog, or reports it unhandled by returning nothing.
    pub async fn resolve(&self, dialog: &DialogSnapshot) -> Option<ResolvedDecision> {
        if let Some((name, decision)) = self.strategies.evaluate(dialog) {
            return Some(self.finish(dialog, decision, ResolvedVia::Strategy(name)));
        }

        if dialog.is_free_text() {
            return self.answer_question(dialog).await;
        }

        if let Some(resolved) = self.consult_backends(dialog).await {
            return Some(resolved);
        }

        self.terminal
            .decide(dialog)
            .map(|decision| self.finish(dialog, decision, ResolvedVia::RuleDefault))
    }

    /// Choice generation through the fallback chain. Exhaustion and invalid
    /// choices both surface as "no decision from this path".
    async fn consult_backends(&self, dialog: &DialogSnapshot) -> Option<ResolvedDecision> {
        if !self.coordinator.any_available().await {
            tracing::debug!(app = %dialog.source_app, "no generation backend available");
            return None;
        }

        let prompt = build_decision_prompt(dialog);
        match self
            .coordinator
            .generate_choice(&prompt, &dialog.options, Some(SYSTEM_PROMPT))
            .await
        {
            Ok((provider, outcome)) => {
                if !dialog.options.iter().any(|o| *o == outcome.choice) {
                    tracing::warn!(
                        provider = %provider,
                        choice = %outcome.choice,
                        "backend chose an option the dialog does not offer, discarding"
                    );
                    return None;
                }
                let decision =
                    Decision::new(outcome.choice, outcome.confidence, outcome.rationale);
                Some(self.finish(dialog, decision, ResolvedVia::Backend(provider)))
            }
            Err(error) => {
                tracing::warn!(app = %dialog.source_app, error = %error, "generation exhausted");
                None
            }
        }
    }

    /// Free-text questions get an unconstrained answer; anything else with no
    /// options is left for a human. Generated answers always require
    /// confirmation.
    async fn answer_question(&self, dialog: &DialogSnapshot) -> Option<ResolvedDecision> {
        if !dialog.prompt_text.trim().ends_with('?') {
            tracing::debug!(
                app = %dialog.source_app,
                "free-text prompt is not a question, leaving it"
            );
            return None;
        }
        if !self.coordinator.any_available().await {
            return None;
        }

        let prompt = build_question_prompt(dialog);
        match self.coordinator.generate(&prompt, Some(SYSTEM_PROMPT)).await {
            Ok((provider, text)) => {
                let answer = text.trim();
                if answer.is_empty() {
                    return None;
                }
                let decision = Decision::new(
                    answer,
                    QUESTION_CONFIDENCE,
                    "Generated answer to a free-text question",
                )
                .with_confirmation(true);
                Some(self.finish(dialog, decision, ResolvedVia::Backend(provider)))
            }
            Err(error) => {
                tracing::warn!(app = %dialog.source_app, error = %error, "question answering exhausted");
                None
            }
        }
    }

    /// Applies the per-application confirmation policy and logs the outcome.
    /// The policy only ever adds confirmation, never removes it.
    fn finish(
        &self,
        dialog: &DialogSnapshot,
        mut decision: Decision,
        via: ResolvedVia,
    ) -> ResolvedDecision {
        if self.apps.requires_confirmation(&dialog.source_app) {
            decision.needs_confirmation = true;
        }
        tracing::info!(
            app = %dialog.source_app,
            option = %decision.chosen_option,
            confidence = decision.confidence,
            via = %via,
            needs_confirmation = decision.needs_confirmation,
            "decision resolved"
        );
        ResolvedDecision { decision, via }
    }
}

// ─── Prompt Construction ────────────────────────────────────────────────────

fn build_decision_prompt(dialog: &DialogSnapshot) -> String {
    use std::fmt::Write;

    let mut prompt = String::from("A dialog has appeared and needs a response.\n\n");
    let _ = writeln!(prompt, "Application: {}", dialog.source_app);
    let _ = writeln!(prompt, "Dialog type: {}", dialog.kind);
    if let Some(title) = &dialog.window_title {
        let _ = writeln!(prompt, "Window: {title}");
    }
    let _ = write!(prompt, "\nDialog text:\n{}", dialog.prompt_text);
    prompt
}

fn build_question_prompt(dialog: &DialogSnapshot) -> String {
    use std::fmt::Write;

    let mut prompt =
        String::from("An application is asking a question that needs a typed answer.\n\n");
    let _ = writeln!(prompt, "Application: {}", dialog.source_app);
    if let Some(title) = &dialog.window_title {
        let _ = writeln!(prompt, "Window: {title}");
    }
    let _ = write!(
        prompt,
        "\nQuestion:\n{}\n\nProvide a brief, directly usable answer. \
         Respond with the answer text only.",
        dialog.prompt_text
    );
    prompt
}

// ─── Tests ──────────────────────────────────────────────────────────────────
