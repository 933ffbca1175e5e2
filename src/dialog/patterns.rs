//! Pattern strategies for coding-assistant approval dialogs.
//!
//! These recognize dialog shapes by exact phrases rather than by source app:
//! shell-command approval prompts carrying a `$`-marked command line, and
//! "edit automatically" prompts. They sit first in the strategy order.

use crate::config::PatternsConfig;
use crate::dialog::strategy::{find_option, find_option_excluding, DecisionStrategy};
use crate::dialog::types::{Decision, DialogSnapshot};

/// Phrases that mark a command-approval prompt.
const COMMAND_PHRASES: [&str; 3] = [
    "allow this bash command",
    "allow this command",
    "run this command",
];

/// Phrases that mark an automatic-edit prompt.
const EDIT_PHRASES: [&str; 2] = ["edit automatically", "apply this edit"];

const NEGATIVE_MARKERS: [&str; 5] = ["no", "don't", "deny", "reject", "cancel"];
const AFFIRMATIVE_MARKERS: [&str; 4] = ["yes", "allow", "ok", "run"];
/// Affirmative variants that widen approval beyond this one command.
const STICKY_MARKERS: [&str; 3] = ["don't ask", "always", "don't show"];

// ─── Command Approval ───────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
enum CommandSafety {
    Safe,
    Dangerous,
    Unknown,
}

/// Approves or rejects shell commands surfaced for confirmation.
///
/// Dangerous fragments are rejected outright, allow-listed prefixes are
/// approved, and anything in between is deferred to the human via the
/// "tell it what to do instead" option when one exists.
pub struct CommandApprovalStrategy {
    safe: Vec<String>,
    dangerous: Vec<String>,
}

impl CommandApprovalStrategy {
    pub fn new(patterns: &PatternsConfig) -> Self {
        Self {
            safe: patterns
                .safe_commands
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
            dangerous: patterns
                .dangerous_commands
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
        }
    }

    /// Pulls the literal command out of the prompt. The usual shape is
    /// `Allow this bash command?\n\n$ cargo build`; some dialogs show the
    /// command on a bare line without the marker.
    fn extract_command(prompt: &str) -> Option<&str> {
        for line in prompt.lines() {
            let line = line.trim();
            if let Some(rest) = line.strip_prefix('$') {
                let rest = rest.trim();
                if !rest.is_empty() {
                    return Some(rest);
                }
            }
        }
        prompt
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.ends_with('?'))
    }

    fn classify(&self, command: &str) -> CommandSafety {
        let lower = command.to_lowercase();
        // Dangerous wins even when the command starts with a safe prefix,
        // e.g. `cat secret > /etc/passwd`.
        if self.dangerous.iter().any(|p| lower.contains(p.as_str())) {
            return CommandSafety::Dangerous;
        }
        let safe = self
            .safe
            .iter()
            .any(|p| lower == *p || lower.starts_with(&format!("{p} ")));
        if safe {
            CommandSafety::Safe
        } else {
            CommandSafety::Unknown
        }
    }
}

impl DecisionStrategy for CommandApprovalStrategy {
    fn name(&self) -> &'static str {
        "command_approval"
    }

    fn can_handle(&self, dialog: &DialogSnapshot) -> bool {
        let prompt = dialog.prompt_text.to_lowercase();
        if COMMAND_PHRASES.iter().any(|p| prompt.contains(p)) {
            return true;
        }
        // Recognize the option shape even when the prompt text is rephrased:
        // yes/no plus a "tell it what to do instead" escape hatch.
        let has_yes = find_option(&dialog.options, &["yes"]).is_some();
        let has_no = find_option(&dialog.options, &["no"]).is_some();
        let has_defer = find_option(&dialog.options, &["instead"]).is_some();
        has_yes && has_no && has_defer
    }

    fn decide(&self, dialog: &DialogSnapshot) -> Option<Decision> {
        let command = Self::extract_command(&dialog.prompt_text).unwrap_or_default();
        match self.classify(command) {
            CommandSafety::Dangerous => {
                let rejection = find_option(&dialog.options, &NEGATIVE_MARKERS)?;
                tracing::warn!(command = %command, "rejecting dangerous command");
                Some(
                    Decision::new(
                        rejection,
                        0.9,
                        format!("Dangerous command detected: {command}"),
                    )
                    .with_confirmation(true),
                )
            }
            CommandSafety::Unknown => {
                let defer = find_option(&dialog.options, &["instead"])?;
                let shown = if command.is_empty() {
                    "(not shown)"
                } else {
                    command
                };
                Some(
                    Decision::new(defer, 0.7, format!("Unknown command safety: {shown}"))
                        .with_confirmation(true),
                )
            }
            CommandSafety::Safe => {
                // Plain approval only; never the "don't ask again" variant.
                let approval =
                    find_option_excluding(&dialog.options, &AFFIRMATIVE_MARKERS, &STICKY_MARKERS)?;
                Some(Decision::new(
                    approval,
                    0.9,
                    format!("Safe command approved: {command}"),
                ))
            }
        }
    }
}

// ─── Automatic Edits ────────────────────────────────────────────────────────

/// Handles "edit automatically" prompts. Approval is opt-in; the default is
/// to decline and flag the dialog for the user.
pub struct AutoEditStrategy {
    auto_approve: bool,
}

impl AutoEditStrategy {
    pub fn new(patterns: &PatternsConfig) -> Self {
        Self {
            auto_approve: patterns.auto_approve_edits,
        }
    }
}

impl DecisionStrategy for AutoEditStrategy {
    fn name(&self) -> &'static str {
        "auto_edit"
    }

    fn can_handle(&self, dialog: &DialogSnapshot) -> bool {
        let prompt = dialog.prompt_text.to_lowercase();
        EDIT_PHRASES.iter().any(|p| prompt.contains(p))
    }

    fn decide(&self, dialog: &DialogSnapshot) -> Option<Decision> {
        if self.auto_approve {
            let approval =
                find_option_excluding(&dialog.options, &AFFIRMATIVE_MARKERS, &STICKY_MARKERS)?;
            Some(Decision::new(
                approval,
                0.8,
                "Automatic edits approved by configuration",
            ))
        } else {
            let rejection = find_option(&dialog.options, &NEGATIVE_MARKERS)?;
            Some(
                Decision::new(rejection, 1.0, "Automatic edits disabled by configuration")
                    .with_confirmation(true),
            )
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn command_strategy() -> CommandApprovalStrategy {
        CommandApprovalStrategy::new(&PatternsConfig::default())
    }

    fn dialog(prompt: &str, options: &[&str]) -> DialogSnapshot {
        DialogSnapshot::new(
            "Code",
            prompt,
            options.iter().map(|o| o.to_string()).collect(),
        )
    }

    #[test]
    fn test_dangerous_command_is_rejected_with_confirmation() {
        let strategy = command_strategy();
        let dialog = dialog("Allow this bash command?\n\n$ rm -rf /", &["Yes", "No"]);
        assert!(strategy.can_handle(&dialog));

        let decision = strategy.decide(&dialog).unwrap();
        assert_eq!(decision.chosen_option, "No");
        assert!(decision.needs_confirmation);
        assert!(decision.rationale.contains("rm -rf /"));
    }

    #[test]
    fn test_safe_command_is_approved() {
        let strategy = command_strategy();
        let dialog = dialog("Allow this bash command?\n\n$ ls -la", &["Yes", "No"]);

        let decision = strategy.decide(&dialog).unwrap();
        assert_eq!(decision.chosen_option, "Yes");
        assert!((decision.confidence - 0.9).abs() < f32::EPSILON);
        assert!(!decision.needs_confirmation);
    }

    #[test]
    fn test_sticky_approval_variant_is_never_chosen() {
        let strategy = command_strategy();
        let dialog = dialog(
            "Allow this bash command?\n\n$ git status",
            &[
                "Yes, and don't ask again",
                "Yes",
                "No",
                "Tell the agent what to do instead",
            ],
        );

        let decision = strategy.decide(&dialog).unwrap();
        assert_eq!(decision.chosen_option, "Yes");
    }

    #[test]
    fn test_unknown_command_defers_to_human() {
        let strategy = command_strategy();
        let dialog = dialog(
            "Allow this bash command?\n\n$ cargo build",
            &["Yes", "No", "Tell the agent what to do instead"],
        );

        let decision = strategy.decide(&dialog).unwrap();
        assert_eq!(decision.chosen_option, "Tell the agent what to do instead");
        assert!((decision.confidence - 0.7).abs() < f32::EPSILON);
        assert!(decision.needs_confirmation);
    }

    #[test]
    fn test_unknown_command_without_defer_option_yields() {
        let strategy = command_strategy();
        let dialog = dialog("Allow this bash command?\n\n$ cargo build", &["Yes", "No"]);
        assert!(strategy.decide(&dialog).is_none());
    }

    #[test]
    fn test_safe_match_requires_prefix_not_substring() {
        let strategy = command_strategy();
        // "false" contains "ls" but is not an allow-listed command.
        assert_eq!(strategy.classify("false"), CommandSafety::Unknown);
        assert_eq!(strategy.classify("ls"), CommandSafety::Safe);
        assert_eq!(strategy.classify("ls -la /tmp"), CommandSafety::Safe);
        assert_eq!(strategy.classify("lsof -i"), CommandSafety::Unknown);
    }

    #[test]
    fn test_dangerous_fragment_overrides_safe_prefix() {
        let strategy = command_strategy();
        assert_eq!(
            strategy.classify("cat notes.txt > /etc/passwd"),
            CommandSafety::Dangerous
        );
        assert_eq!(strategy.classify("sudo ls"), CommandSafety::Dangerous);
    }

    #[test]
    fn test_extract_command_prefers_dollar_marker() {
        assert_eq!(
            CommandApprovalStrategy::extract_command("Allow this bash command?\n\n$ pwd"),
            Some("pwd")
        );
        assert_eq!(
            CommandApprovalStrategy::extract_command("Run this command?\ngit fetch origin"),
            Some("git fetch origin")
        );
        assert_eq!(
            CommandApprovalStrategy::extract_command("Allow this bash command?"),
            None
        );
    }

    #[test]
    fn test_recognizes_option_shape_without_phrase() {
        let strategy = command_strategy();
        let shaped = dialog(
            "The agent wants to run a terminal command",
            &["Yes", "No", "Tell the agent what to do instead"],
        );
        assert!(strategy.can_handle(&shaped));

        let plain = dialog("The agent wants to run a terminal command", &["Yes", "No"]);
        assert!(!strategy.can_handle(&plain));
    }

    #[test]
    fn test_auto_edit_declines_by_default() {
        let strategy = AutoEditStrategy::new(&PatternsConfig::default());
        let dialog = dialog("Edit automatically?", &["Yes", "No"]);
        assert!(strategy.can_handle(&dialog));

        let decision = strategy.decide(&dialog).unwrap();
        assert_eq!(decision.chosen_option, "No");
        assert!((decision.confidence - 1.0).abs() < f32::EPSILON);
        assert!(decision.needs_confirmation);
    }

    #[test]
    fn test_auto_edit_approves_when_opted_in() {
        let patterns = PatternsConfig {
            auto_approve_edits: true,
            ..PatternsConfig::default()
        };
        let strategy = AutoEditStrategy::new(&patterns);
        let dialog = dialog("Edit automatically?", &["Yes", "No"]);

        let decision = strategy.decide(&dialog).unwrap();
        assert_eq!(decision.chosen_option, "Yes");
        assert!(!decision.needs_confirmation);
    }

    #[test]
    fn test_auto_edit_ignores_unrelated_dialogs() {
        let strategy = AutoEditStrategy::new(&PatternsConfig::default());
        let dialog = dialog("Save changes before closing?", &["Save", "Cancel"]);
        assert!(!strategy.can_handle(&dialog));
    }
}
