//! Core data types for observed dialogs and resolved decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Substituted whenever a decision would otherwise carry an empty rationale.
const EMPTY_RATIONALE: &str = "no rationale provided";

// ─── Accessibility Elements ─────────────────────────────────────────────────

/// One element lifted from the accessibility tree of an observed window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiElement {
    /// Accessibility role, e.g. `AXButton` or `AXStaticText`.
    pub role: String,
    /// Visible label of the element, if any.
    #[serde(default)]
    pub title: Option<String>,
    /// Textual value of the element, if any.
    #[serde(default)]
    pub value: Option<String>,
}

impl UiElement {
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            title: None,
            value: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

// ─── Dialog Classification ──────────────────────────────────────────────────

/// Coarse classification of what a dialog is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogKind {
    SaveConfirmation,
    UpdatePrompt,
    PermissionRequest,
    Error,
    #[default]
    Generic,
}

impl DialogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DialogKind::SaveConfirmation => "save_confirmation",
            DialogKind::UpdatePrompt => "update_prompt",
            DialogKind::PermissionRequest => "permission_request",
            DialogKind::Error => "error",
            DialogKind::Generic => "generic",
        }
    }
}

impl fmt::Display for DialogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Dialog Snapshot ────────────────────────────────────────────────────────

/// A normalized view of one dialog at the moment it was observed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogSnapshot {
    /// Name of the application that presented the dialog.
    pub source_app: String,
    /// Title of the window hosting the dialog, when one was reported.
    #[serde(default)]
    pub window_title: Option<String>,
    /// Classified intent of the dialog.
    #[serde(default)]
    pub kind: DialogKind,
    /// The dialog's message text.
    pub prompt_text: String,
    /// Actionable button labels in on-screen order. Empty for free-text prompts.
    #[serde(default)]
    pub options: Vec<String>,
    /// The raw elements the snapshot was built from.
    #[serde(default)]
    pub raw_elements: Vec<UiElement>,
    /// When the dialog was captured.
    pub captured_at: DateTime<Utc>,
}

impl DialogSnapshot {
    pub fn new(
        source_app: impl Into<String>,
        prompt_text: impl Into<String>,
        options: Vec<String>,
    ) -> Self {
        Self {
            source_app: source_app.into(),
            window_title: None,
            kind: DialogKind::default(),
            prompt_text: prompt_text.into(),
            options: dedup_keep_first(options),
            raw_elements: Vec::new(),
            captured_at: Utc::now(),
        }
    }

    pub fn with_kind(mut self, kind: DialogKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_window_title(mut self, title: impl Into<String>) -> Self {
        self.window_title = Some(title.into());
        self
    }

    /// A dialog with no actionable options expects a typed answer.
    pub fn is_free_text(&self) -> bool {
        self.options.is_empty()
    }
}

/// Drops exact duplicate entries, keeping the first occurrence in order.
pub(crate) fn dedup_keep_first(options: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    options
        .into_iter()
        .filter(|option| seen.insert(option.clone()))
        .collect()
}

// ─── Decision ───────────────────────────────────────────────────────────────

/// The outcome of resolving a dialog: which option to pick and with what
/// certainty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// The option to act on. For free-text dialogs this is the answer text.
    pub chosen_option: String,
    /// Certainty in the range 0.0 to 1.0.
    pub confidence: f32,
    /// Human-readable reason for the choice. Never empty.
    pub rationale: String,
    /// When set, the decision must be surfaced to the user instead of executed.
    #[serde(default)]
    pub needs_confirmation: bool,
}

impl Decision {
    pub fn new(
        chosen_option: impl Into<String>,
        confidence: f32,
        rationale: impl Into<String>,
    ) -> Self {
        let rationale = rationale.into();
        let rationale = if rationale.trim().is_empty() {
            EMPTY_RATIONALE.to_string()
        } else {
            rationale
        };
        Self {
            chosen_option: chosen_option.into(),
            confidence: confidence.clamp(0.0, 1.0),
            rationale,
            needs_confirmation: false,
        }
    }

    pub fn with_confirmation(mut self, needs_confirmation: bool) -> Self {
        self.needs_confirmation = needs_confirmation;
        self
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
