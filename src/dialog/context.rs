//! Builds a `DialogSnapshot` from raw accessibility elements.
//!
//! The builder is a pure transformation: pressable controls become `options`,
//! readable text becomes `prompt_text`, and a keyword classifier assigns the
//! dialog kind. Element sets lacking either buttons or text are not dialogs
//! and produce nothing.

use crate::config::KeywordsConfig;
use crate::dialog::types::{dedup_keep_first, DialogKind, DialogSnapshot, UiElement};

/// Roles treated as pressable controls.
const BUTTON_ROLES: [&str; 2] = ["AXButton", "AXDefaultButton"];

/// Roles treated as readable dialog text.
const TEXT_ROLES: [&str; 3] = ["AXStaticText", "AXTextField", "AXTextArea"];

pub struct ContextBuilder {
    /// Keyword sets per kind, in classification priority order, pre-lowercased.
    classifiers: Vec<(DialogKind, Vec<String>)>,
}

impl ContextBuilder {
    pub fn new(keywords: &KeywordsConfig) -> Self {
        let lower = |words: &[String]| -> Vec<String> {
            words.iter().map(|w| w.to_lowercase()).collect()
        };
        // Priority: save beats update beats permission beats error.
        let classifiers = vec![
            (DialogKind::SaveConfirmation, lower(&keywords.save)),
            (DialogKind::UpdatePrompt, lower(&keywords.update)),
            (DialogKind::PermissionRequest, lower(&keywords.permission)),
            (DialogKind::Error, lower(&keywords.error)),
        ];
        Self { classifiers }
    }

    /// Assembles a snapshot from one window's elements, or nothing when the
    /// elements do not form a dialog.
    pub fn build(
        &self,
        source_app: &str,
        window_title: Option<&str>,
        elements: &[UiElement],
    ) -> Option<DialogSnapshot> {
        if source_app.trim().is_empty() {
            tracing::debug!("element set has no source app, skipping");
            return None;
        }

        let mut options = Vec::new();
        let mut fragments = Vec::new();

        for element in elements {
            if BUTTON_ROLES.contains(&element.role.as_str()) {
                if let Some(title) = non_empty(element.title.as_deref()) {
                    options.push(title.to_string());
                }
            } else if TEXT_ROLES.contains(&element.role.as_str()) {
                // Editable fields report their content as value; labels as title.
                let text = non_empty(element.value.as_deref())
                    .or_else(|| non_empty(element.title.as_deref()));
                if let Some(text) = text {
                    fragments.push(text);
                }
            }
        }

        if options.is_empty() || fragments.is_empty() {
            tracing::debug!(
                app = %source_app,
                buttons = options.len(),
                texts = fragments.len(),
                "element set is not a dialog, skipping"
            );
            return None;
        }

        let options = dedup_keep_first(options);
        let prompt_text = fragments.join(" ");
        let kind = self.classify(&prompt_text, &options);

        let mut snapshot = DialogSnapshot::new(source_app, prompt_text, options).with_kind(kind);
        snapshot.window_title = window_title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        snapshot.raw_elements = elements.to_vec();
        Some(snapshot)
    }

    /// First kind whose keyword set matches the prompt or any option wins.
    fn classify(&self, prompt_text: &str, options: &[String]) -> DialogKind {
        let mut haystack = prompt_text.to_lowercase();
        for option in options {
            haystack.push(' ');
            haystack.push_str(&option.to_lowercase());
        }
        for (kind, keywords) in &self.classifiers {
            if keywords.iter().any(|k| haystack.contains(k.as_str())) {
                return *kind;
            }
        }
        DialogKind::Generic
    }
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> ContextBuilder {
        ContextBuilder::new(&KeywordsConfig::default())
    }

    fn button(title: &str) -> UiElement {
        UiElement::new("AXButton").with_title(title)
    }

    fn text(value: &str) -> UiElement {
        UiElement::new("AXStaticText").with_value(value)
    }

    #[test]
    fn test_build_collects_buttons_and_text_in_order() {
        let elements = vec![
            text("Do you want to save the changes"),
            button("Save"),
            text("made to the document?"),
            button("Don't Save"),
            button("Cancel"),
        ];
        let snapshot = builder().build("TextEdit", None, &elements).unwrap();
        assert_eq!(
            snapshot.prompt_text,
            "Do you want to save the changes made to the document?"
        );
        assert_eq!(snapshot.options, vec!["Save", "Don't Save", "Cancel"]);
        assert_eq!(snapshot.raw_elements.len(), 5);
    }

    #[test]
    fn test_build_needs_both_buttons_and_text() {
        let only_buttons = vec![button("OK"), button("Cancel")];
        assert!(builder().build("Finder", None, &only_buttons).is_none());

        let only_text = vec![text("Something happened.")];
        assert!(builder().build("Finder", None, &only_text).is_none());

        assert!(builder().build("Finder", None, &[]).is_none());
    }

    #[test]
    fn test_build_rejects_empty_source_app() {
        let elements = vec![text("Save changes?"), button("OK")];
        assert!(builder().build("", None, &elements).is_none());
        assert!(builder().build("   ", None, &elements).is_none());
    }

    #[test]
    fn test_build_skips_blank_titles_and_values() {
        let elements = vec![
            UiElement::new("AXButton").with_title("  "),
            button("OK"),
            UiElement::new("AXStaticText"),
            text("Proceed with the operation?"),
        ];
        let snapshot = builder().build("Finder", None, &elements).unwrap();
        assert_eq!(snapshot.options, vec!["OK"]);
        assert_eq!(snapshot.prompt_text, "Proceed with the operation?");
    }

    #[test]
    fn test_text_fields_prefer_value_over_title() {
        let elements = vec![
            UiElement::new("AXTextField")
                .with_title("Name:")
                .with_value("report.txt"),
            UiElement::new("AXStaticText").with_title("Save as"),
            button("Save"),
        ];
        let snapshot = builder().build("TextEdit", None, &elements).unwrap();
        assert_eq!(snapshot.prompt_text, "report.txt Save as");
    }

    #[test]
    fn test_default_button_role_counts_as_option() {
        let elements = vec![
            text("Replace the existing file?"),
            UiElement::new("AXDefaultButton").with_title("Replace"),
            button("Cancel"),
        ];
        let snapshot = builder().build("Finder", None, &elements).unwrap();
        assert_eq!(snapshot.options, vec!["Replace", "Cancel"]);
    }

    #[test]
    fn test_unknown_roles_are_ignored() {
        let elements = vec![
            UiElement::new("AXImage").with_title("icon"),
            text("Allow access to your photos?"),
            UiElement::new("AXCheckBox").with_title("Remember"),
            button("Allow"),
            button("Don't Allow"),
        ];
        let snapshot = builder().build("Photos", None, &elements).unwrap();
        assert_eq!(snapshot.options, vec!["Allow", "Don't Allow"]);
        assert_eq!(snapshot.prompt_text, "Allow access to your photos?");
    }

    #[test]
    fn test_classification_priority_save_over_update() {
        let elements = vec![
            text("Save your work before the update restarts the app?"),
            button("Save"),
            button("Later"),
        ];
        let snapshot = builder().build("Notes", None, &elements).unwrap();
        assert_eq!(snapshot.kind, DialogKind::SaveConfirmation);
    }

    #[test]
    fn test_classification_covers_localized_keywords() {
        let elements = vec![
            text("Voulez-vous enregistrer les modifications ?"),
            button("Enregistrer"),
            button("Annuler"),
        ];
        let snapshot = builder().build("TextEdit", None, &elements).unwrap();
        assert_eq!(snapshot.kind, DialogKind::SaveConfirmation);
    }

    #[test]
    fn test_classification_reads_options_too() {
        // Prompt text alone is neutral; the button label carries the signal.
        let elements = vec![
            text("example.com wants to show notifications"),
            button("Allow"),
            button("Deny"),
        ];
        let snapshot = builder().build("Safari", None, &elements).unwrap();
        assert_eq!(snapshot.kind, DialogKind::PermissionRequest);
    }

    #[test]
    fn test_unmatched_text_classifies_generic() {
        let elements = vec![
            text("The operation completed."),
            button("OK"),
        ];
        let snapshot = builder().build("Finder", None, &elements).unwrap();
        assert_eq!(snapshot.kind, DialogKind::Generic);
    }

    #[test]
    fn test_window_title_is_trimmed_and_optional() {
        let elements = vec![text("Save changes?"), button("Save")];
        let with_title = builder()
            .build("TextEdit", Some("  Untitled 3  "), &elements)
            .unwrap();
        assert_eq!(with_title.window_title.as_deref(), Some("Untitled 3"));

        let blank_title = builder().build("TextEdit", Some("   "), &elements).unwrap();
        assert!(blank_title.window_title.is_none());
    }

    #[test]
    fn test_duplicate_buttons_keep_first() {
        let elements = vec![
            text("Apply to all items?"),
            button("Apply"),
            button("Cancel"),
            button("Apply"),
        ];
        let snapshot = builder().build("Finder", None, &elements).unwrap();
        assert_eq!(snapshot.options, vec!["Apply", "Cancel"]);
    }
}
