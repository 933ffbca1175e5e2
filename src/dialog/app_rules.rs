//! Per-application decision tables.
//!
//! Each supported application gets one strategy matched by exact app name.
//! A strategy is a small ordered table: keyword triggers on the prompt text,
//! an optional option-shape gate, and a pick specification resolved against
//! the dialog's actual options. Unlike the prompt triggers, picks never
//! invent a label; a rule whose pick finds no matching option is skipped.

use crate::dialog::strategy::{find_option, find_option_excluding, DecisionStrategy};
use crate::dialog::types::{Decision, DialogSnapshot};

/// How a rule selects the option to press.
enum OptionPick {
    /// First option containing any of the keywords.
    Containing(&'static [&'static str]),
    /// First option containing any of `any` and none of `none`.
    ContainingExcept {
        any: &'static [&'static str],
        none: &'static [&'static str],
    },
}

struct AppRule {
    /// At least one of these must appear in the lowered prompt. Empty = no
    /// constraint.
    trigger_any: &'static [&'static str],
    /// All of these must appear in the lowered prompt.
    trigger_all: &'static [&'static str],
    /// Rule is armed only when some option contains one of these. Empty = no
    /// constraint.
    requires_option: &'static [&'static str],
    pick: OptionPick,
    confidence: f32,
    needs_confirmation: bool,
    rationale: &'static str,
}

impl AppRule {
    fn armed(&self, prompt_lower: &str, options: &[String]) -> bool {
        let any_ok = self.trigger_any.is_empty()
            || self.trigger_any.iter().any(|k| prompt_lower.contains(k));
        let all_ok = self.trigger_all.iter().all(|k| prompt_lower.contains(k));
        let gate_ok = self.requires_option.is_empty()
            || options
                .iter()
                .any(|o| self.requires_option.iter().any(|k| o.to_lowercase().contains(k)));
        any_ok && all_ok && gate_ok
    }

    fn resolve<'a>(&self, options: &'a [String]) -> Option<&'a str> {
        match self.pick {
            OptionPick::Containing(any) => find_option(options, any),
            OptionPick::ContainingExcept { any, none } => {
                find_option_excluding(options, any, none)
            }
        }
    }
}

/// One application's rule table, consulted in order.
pub struct AppRuleStrategy {
    app: &'static str,
    name: &'static str,
    rules: &'static [AppRule],
}

impl DecisionStrategy for AppRuleStrategy {
    fn name(&self) -> &'static str {
        self.name
    }

    fn can_handle(&self, dialog: &DialogSnapshot) -> bool {
        dialog.source_app == self.app
    }

    fn decide(&self, dialog: &DialogSnapshot) -> Option<Decision> {
        let prompt = dialog.prompt_text.to_lowercase();
        for rule in self.rules {
            if !rule.armed(&prompt, &dialog.options) {
                continue;
            }
            if let Some(option) = rule.resolve(&dialog.options) {
                return Some(
                    Decision::new(option, rule.confidence, rule.rationale)
                        .with_confirmation(rule.needs_confirmation),
                );
            }
        }
        None
    }
}

// ─── Rule Tables ────────────────────────────────────────────────────────────

const NONE: &[&str] = &[];

static TEXTEDIT_RULES: &[AppRule] = &[
    // Close-with-unsaved-changes sheet. Only fires on the real three-button
    // shape; a bare OK/Cancel alert is left to later resolution paths.
    AppRule {
        trigger_any: &["save", "enregistrer"],
        trigger_all: NONE,
        requires_option: &["don't save", "ne pas enregistrer"],
        pick: OptionPick::ContainingExcept {
            any: &["save", "enregistrer"],
            none: &["don't", "do not", "ne pas"],
        },
        confidence: 0.8,
        needs_confirmation: false,
        rationale: "Unsaved documents default to being saved",
    },
];

static FINDER_RULES: &[AppRule] = &[
    AppRule {
        trigger_any: &["delete", "remove", "trash", "empty", "supprimer"],
        trigger_all: NONE,
        requires_option: NONE,
        pick: OptionPick::Containing(&["cancel", "annuler"]),
        confidence: 0.9,
        needs_confirmation: true,
        rationale: "Destructive file operations wait for the user",
    },
    AppRule {
        trigger_any: &["replace", "remplacer"],
        trigger_all: NONE,
        requires_option: NONE,
        pick: OptionPick::Containing(&["cancel", "annuler", "keep both"]),
        confidence: 0.8,
        needs_confirmation: true,
        rationale: "Overwriting files waits for the user",
    },
];

static SAFARI_RULES: &[AppRule] = &[
    AppRule {
        trigger_any: &["download", "télécharger"],
        trigger_all: NONE,
        requires_option: NONE,
        pick: OptionPick::Containing(&["allow", "autoriser"]),
        confidence: 0.7,
        needs_confirmation: false,
        rationale: "Downloads are allowed automatically",
    },
    AppRule {
        trigger_any: NONE,
        trigger_all: &["close", "tab"],
        requires_option: NONE,
        pick: OptionPick::Containing(&["close", "fermer"]),
        confidence: 0.6,
        needs_confirmation: false,
        rationale: "Closing multiple tabs is harmless",
    },
    AppRule {
        trigger_any: &["clear", "remove", "delete", "effacer"],
        trigger_all: NONE,
        requires_option: NONE,
        pick: OptionPick::Containing(&["cancel", "annuler"]),
        confidence: 0.9,
        needs_confirmation: true,
        rationale: "Clearing browsing data waits for the user",
    },
];

static MAIL_RULES: &[AppRule] = &[
    AppRule {
        trigger_any: &["delete", "supprimer"],
        trigger_all: NONE,
        requires_option: NONE,
        pick: OptionPick::Containing(&["delete", "supprimer"]),
        confidence: 0.7,
        needs_confirmation: false,
        rationale: "Deleted mail is recoverable from the trash",
    },
    AppRule {
        trigger_any: NONE,
        trigger_all: &["subject", "send"],
        requires_option: NONE,
        pick: OptionPick::Containing(&["don't send", "ne pas envoyer"]),
        confidence: 0.8,
        needs_confirmation: false,
        rationale: "Mail without a subject is held back",
    },
    AppRule {
        trigger_any: &["large", "size", "attachment"],
        trigger_all: NONE,
        requires_option: NONE,
        pick: OptionPick::ContainingExcept {
            any: &["send", "envoyer"],
            none: &["don't", "ne pas"],
        },
        confidence: 0.6,
        needs_confirmation: true,
        rationale: "Large attachments are sent after a check",
    },
];

static NOTES_RULES: &[AppRule] = &[
    AppRule {
        trigger_any: &["delete", "supprimer"],
        trigger_all: NONE,
        requires_option: NONE,
        pick: OptionPick::Containing(&["delete", "supprimer"]),
        confidence: 0.7,
        needs_confirmation: false,
        rationale: "Deleted notes remain in Recently Deleted",
    },
    AppRule {
        trigger_any: &["save", "enregistrer"],
        trigger_all: NONE,
        requires_option: NONE,
        pick: OptionPick::ContainingExcept {
            any: &["save", "enregistrer"],
            none: &["don't", "do not", "ne pas"],
        },
        confidence: 0.9,
        needs_confirmation: false,
        rationale: "Notes are always saved",
    },
];

static XCODE_RULES: &[AppRule] = &[
    AppRule {
        trigger_any: &["build"],
        trigger_all: NONE,
        requires_option: NONE,
        pick: OptionPick::Containing(&["continue"]),
        confidence: 0.5,
        needs_confirmation: true,
        rationale: "Build warnings can be continued past",
    },
    AppRule {
        trigger_any: NONE,
        trigger_all: &["delete", "derived"],
        requires_option: NONE,
        pick: OptionPick::Containing(&["delete"]),
        confidence: 0.8,
        needs_confirmation: false,
        rationale: "Derived data is regenerated on the next build",
    },
    AppRule {
        trigger_any: &["sign", "certificate", "provisioning"],
        trigger_all: NONE,
        requires_option: NONE,
        pick: OptionPick::Containing(&["cancel"]),
        confidence: 0.9,
        needs_confirmation: true,
        rationale: "Code signing needs the user's account",
    },
];

static PHOTOS_RULES: &[AppRule] = &[
    AppRule {
        trigger_any: &["delete", "supprimer"],
        trigger_all: NONE,
        requires_option: NONE,
        pick: OptionPick::Containing(&["delete", "supprimer"]),
        confidence: 0.6,
        needs_confirmation: false,
        rationale: "Deleted photos stay in Recently Deleted for 30 days",
    },
    AppRule {
        trigger_any: &["import", "importer"],
        trigger_all: NONE,
        requires_option: NONE,
        pick: OptionPick::Containing(&["import"]),
        confidence: 0.8,
        needs_confirmation: false,
        rationale: "Imports are allowed automatically",
    },
    AppRule {
        trigger_any: &["optimize", "optimise", "storage"],
        trigger_all: NONE,
        requires_option: NONE,
        pick: OptionPick::Containing(&["optimize", "optimise"]),
        confidence: 0.7,
        needs_confirmation: false,
        rationale: "Storage optimization is reversible",
    },
];

static SLACK_RULES: &[AppRule] = &[
    AppRule {
        trigger_any: &["notification"],
        trigger_all: NONE,
        requires_option: NONE,
        pick: OptionPick::Containing(&["allow", "autoriser"]),
        confidence: 0.9,
        needs_confirmation: false,
        rationale: "Notifications are expected for chat apps",
    },
    AppRule {
        trigger_any: &["update", "mise à jour"],
        trigger_all: NONE,
        requires_option: NONE,
        pick: OptionPick::Containing(&["later", "remind", "plus tard"]),
        confidence: 0.7,
        needs_confirmation: false,
        rationale: "Updates are deferred to avoid interrupting work",
    },
];

/// The built-in application strategies, in evaluation order.
pub fn builtin_strategies() -> Vec<AppRuleStrategy> {
    vec![
        AppRuleStrategy {
            app: "TextEdit",
            name: "textedit_rules",
            rules: TEXTEDIT_RULES,
        },
        AppRuleStrategy {
            app: "Finder",
            name: "finder_rules",
            rules: FINDER_RULES,
        },
        AppRuleStrategy {
            app: "Safari",
            name: "safari_rules",
            rules: SAFARI_RULES,
        },
        AppRuleStrategy {
            app: "Mail",
            name: "mail_rules",
            rules: MAIL_RULES,
        },
        AppRuleStrategy {
            app: "Notes",
            name: "notes_rules",
            rules: NOTES_RULES,
        },
        AppRuleStrategy {
            app: "Xcode",
            name: "xcode_rules",
            rules: XCODE_RULES,
        },
        AppRuleStrategy {
            app: "Photos",
            name: "photos_rules",
            rules: PHOTOS_RULES,
        },
        AppRuleStrategy {
            app: "Slack",
            name: "slack_rules",
            rules: SLACK_RULES,
        },
    ]
}

// ─── Tests ──────────────────────────────────────────────────────────────────
