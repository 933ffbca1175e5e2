//! Shared types for the generation backends.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a generation backend provider.
///
/// Serialized lowercase so config files read naturally
/// (`priority: [anthropic, ollama]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Anthropic,
    Openai,
    Gemini,
    Ollama,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Openai => "openai",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Ollama => "ollama",
        }
    }

    /// Parse a provider name as written in config files.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Some(ProviderKind::Anthropic),
            "openai" => Some(ProviderKind::Openai),
            "gemini" => Some(ProviderKind::Gemini),
            "ollama" => Some(ProviderKind::Ollama),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured choice extracted from a backend reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceOutcome {
    /// The option text the backend settled on.
    pub choice: String,
    /// The backend's stated reason, or a parser-supplied placeholder.
    pub rationale: String,
    /// Confidence in `[0.0, 1.0]`.
    pub confidence: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_str_parse_round_trip() {
        for kind in [
            ProviderKind::Anthropic,
            ProviderKind::Openai,
            ProviderKind::Gemini,
            ProviderKind::Ollama,
        ] {
            assert_eq!(ProviderKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_parse_accepts_claude_alias() {
        assert_eq!(ProviderKind::parse("Claude"), Some(ProviderKind::Anthropic));
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert_eq!(ProviderKind::parse("palm"), None);
    }

    #[test]
    fn test_yaml_deserializes_lowercase() {
        let kinds: Vec<ProviderKind> = serde_yaml::from_str("[anthropic, ollama]").unwrap();
        assert_eq!(kinds, vec![ProviderKind::Anthropic, ProviderKind::Ollama]);
    }
}
