//! Deterministic terminal fallback, applied when neither a strategy nor a
//! generation backend produced a decision.

use crate::config::KeywordsConfig;
use crate::dialog::strategy::{contains_keyword, DecisionStrategy};
use crate::dialog::types::{Decision, DialogSnapshot};

/// Picks an option by keyword preference alone. No randomness: the same
/// dialog always yields the same decision.
pub struct RuleBasedDefault {
    prefer_safe: Vec<String>,
    cancel_like: Vec<String>,
}

impl RuleBasedDefault {
    pub fn new(keywords: &KeywordsConfig) -> Self {
        Self {
            prefer_safe: keywords
                .prefer_safe
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
            cancel_like: keywords
                .cancel_like
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
        }
    }

    fn is_safe_looking(&self, option: &str) -> bool {
        self.prefer_safe.iter().any(|k| contains_keyword(option, k))
    }

    fn is_cancel_like(&self, option: &str) -> bool {
        self.cancel_like.iter().any(|k| contains_keyword(option, k))
    }
}

impl DecisionStrategy for RuleBasedDefault {
    fn name(&self) -> &'static str {
        "rule_default"
    }

    fn can_handle(&self, dialog: &DialogSnapshot) -> bool {
        !dialog.options.is_empty()
    }

    fn decide(&self, dialog: &DialogSnapshot) -> Option<Decision> {
        if dialog.options.is_empty() {
            return None;
        }

        // Safe-looking options are taken eagerly but flagged for the user.
        if let Some(option) = dialog.options.iter().find(|o| self.is_safe_looking(o)) {
            return Some(
                Decision::new(option.as_str(), 0.65, "Rule default: preferred the safe option")
                    .with_confirmation(true),
            );
        }

        // Otherwise take the first option that is not a dismissal.
        if let Some(option) = dialog.options.iter().find(|o| !self.is_cancel_like(o)) {
            return Some(Decision::new(
                option.as_str(),
                0.55,
                "Rule default: first non-dismissive option",
            ));
        }

        // Every option looks like a cancel; leave the dialog alone.
        None
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn default_rules() -> RuleBasedDefault {
        RuleBasedDefault::new(&KeywordsConfig::default())
    }

    fn dialog(options: &[&str]) -> DialogSnapshot {
        DialogSnapshot::new(
            "SomeApp",
            "Make a choice",
            options.iter().map(|o| o.to_string()).collect(),
        )
    }

    #[test]
    fn test_save_dialog_prefers_save() {
        let decision = default_rules()
            .decide(&dialog(&["Save", "Don't Save", "Cancel"]))
            .unwrap();
        assert_eq!(decision.chosen_option, "Save");
        assert!(decision.needs_confirmation);
        assert!(decision.confidence >= 0.6 && decision.confidence <= 0.7);
    }

    #[test]
    fn test_localized_safe_option_is_recognized() {
        let decision = default_rules()
            .decide(&dialog(&["Annuler", "Enregistrer"]))
            .unwrap();
        assert_eq!(decision.chosen_option, "Enregistrer");
        assert!(decision.needs_confirmation);
    }

    #[test]
    fn test_falls_back_to_first_non_dismissive_option() {
        let decision = default_rules()
            .decide(&dialog(&["Cancel", "Ask Again", "Not Now"]))
            .unwrap();
        assert_eq!(decision.chosen_option, "Ask Again");
        assert!(!decision.needs_confirmation);
        assert!(decision.confidence >= 0.5 && decision.confidence < 0.6);
    }

    #[test]
    fn test_all_dismissive_options_yield_nothing() {
        assert!(default_rules().decide(&dialog(&["Cancel", "No"])).is_none());
        assert!(default_rules()
            .decide(&dialog(&["Annuler", "Non", "Not Now"]))
            .is_none());
    }

    #[test]
    fn test_short_cancel_keywords_do_not_poison_longer_words() {
        // "Notes" must not read as "no".
        let decision = default_rules()
            .decide(&dialog(&["Open Notes", "Cancel"]))
            .unwrap();
        assert_eq!(decision.chosen_option, "Open Notes");
    }

    #[test]
    fn test_no_options_yields_nothing() {
        assert!(default_rules().decide(&dialog(&[])).is_none());
    }
}
