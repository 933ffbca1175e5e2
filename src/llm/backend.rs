//! The generation backend capability.
//!
//! Each provider (local Ollama, remote APIs) implements [`GenerationBackend`]
//! once; the fallback coordinator owns the instances and never cares which
//! concrete provider answered. Structured choice generation is a provided
//! method so every provider renders the same numbered-options prompt and runs
//! the same reply parser.

use async_trait::async_trait;

use super::errors::BackendError;
use super::parser;
use super::types::{ChoiceOutcome, ProviderKind};

/// An interchangeable text/choice generation service.
///
/// Implementations are constructed once at pipeline start, shared behind
/// `Arc`, and must be safe for concurrent calls.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Which provider this instance speaks to.
    fn kind(&self) -> ProviderKind;

    /// Whether the backend can accept a request right now.
    ///
    /// Remote providers check for a configured key; the local provider probes
    /// its server. Must stay cheap, as the coordinator calls it per attempt.
    async fn is_available(&self) -> bool;

    /// Confidence reported for cleanly parsed structured choices.
    fn choice_confidence(&self) -> f32 {
        0.8
    }

    /// Produce free-form text for `prompt`.
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<String, BackendError>;

    /// Ask the model to pick one of `options`.
    ///
    /// Renders the numbered-options block, generates, and parses the reply.
    /// The parser is total, so any successful generation yields an outcome.
    async fn generate_choice(
        &self,
        prompt: &str,
        options: &[String],
        system_prompt: Option<&str>,
    ) -> Result<ChoiceOutcome, BackendError> {
        let full_prompt = render_choice_prompt(prompt, options);
        let reply = self.generate(&full_prompt, system_prompt).await?;
        Ok(parser::parse_choice(&reply, options, self.choice_confidence()))
    }
}

/// Append the numbered options and the answer-format instruction.
pub(crate) fn render_choice_prompt(prompt: &str, options: &[String]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(prompt.len() + 128);
    out.push_str(prompt);
    out.push_str("\n\nAvailable options:\n");
    for (i, option) in options.iter().enumerate() {
        // Write into a String cannot fail.
        let _ = writeln!(out, "{}. {}", i + 1, option);
    }
    out.push_str("\nRespond with ONLY the number of your choice and a brief reason.");
    out
}

// ─── Tests ───────────────────────────────────────────────────────────────────
