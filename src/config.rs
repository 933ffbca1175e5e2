//! Pipeline configuration loading and defaults.
//!
//! Reads `dialogpilot.yaml`, resolves environment variables, and falls back
//! to built-in defaults for every field so the pipeline can start with no
//! config file at all. The config is the single source of truth for backend
//! priority, per-application policies, and the keyword data the heuristic
//! strategies run on; the heuristics themselves contain no hidden lists.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::PipelineError;
use crate::llm::types::ProviderKind;

/// Config file name searched for on disk.
pub const CONFIG_FILE_NAME: &str = "dialogpilot.yaml";

/// Env var that overrides config discovery with an explicit path.
pub const CONFIG_PATH_ENV: &str = "DIALOGPILOT_CONFIG";

// ─── Backend Settings ────────────────────────────────────────────────────────

/// Local Ollama endpoint settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "phi3:mini".to_string(),
            temperature: 0.2,
        }
    }
}

/// OpenAI chat-completions settings (also covers compatible gateways).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API key. When empty, `OPENAI_API_KEY` is consulted at startup.
    pub api_key: String,
    pub model: String,
    /// Endpoint root, overridable for OpenAI-compatible gateways.
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

impl OpenAiConfig {
    /// Resolve the API key from config or environment.
    pub fn resolve_key(&self) -> Option<String> {
        resolve_key(&self.api_key, "OPENAI_API_KEY")
    }
}

/// Anthropic messages-API settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnthropicConfig {
    /// API key. When empty, `ANTHROPIC_API_KEY` is consulted at startup.
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "claude-3-5-sonnet-20241022".to_string(),
            max_tokens: 1024,
        }
    }
}

impl AnthropicConfig {
    /// Resolve the API key from config or environment.
    pub fn resolve_key(&self) -> Option<String> {
        resolve_key(&self.api_key, "ANTHROPIC_API_KEY")
    }
}

/// Google Gemini settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API key. When empty, `GEMINI_API_KEY` is consulted at startup.
    pub api_key: String,
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-2.0-flash-exp".to_string(),
        }
    }
}

impl GeminiConfig {
    /// Resolve the API key from config or environment.
    pub fn resolve_key(&self) -> Option<String> {
        resolve_key(&self.api_key, "GEMINI_API_KEY")
    }
}

fn resolve_key(configured: &str, env_var: &str) -> Option<String> {
    let trimmed = configured.trim();
    if !trimmed.is_empty() {
        return Some(trimmed.to_string());
    }
    std::env::var(env_var).ok().filter(|k| !k.trim().is_empty())
}

/// Fallback-chain configuration: which backends exist and in what order
/// the coordinator tries them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendsConfig {
    /// Providers tried strictly in this order until one succeeds.
    pub priority: Vec<ProviderKind>,
    /// Per-backend request budget; a hung backend is abandoned after this.
    pub request_timeout_secs: u64,
    pub ollama: OllamaConfig,
    pub openai: OpenAiConfig,
    pub anthropic: AnthropicConfig,
    pub gemini: GeminiConfig,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            priority: vec![
                ProviderKind::Anthropic,
                ProviderKind::Openai,
                ProviderKind::Gemini,
                ProviderKind::Ollama,
            ],
            request_timeout_secs: 30,
            ollama: OllamaConfig::default(),
            openai: OpenAiConfig::default(),
            anthropic: AnthropicConfig::default(),
            gemini: GeminiConfig::default(),
        }
    }
}

// ─── Application Policies ────────────────────────────────────────────────────

/// Which applications the pipeline touches and which decisions need a human.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppsConfig {
    /// Apps never processed. Matched case-insensitively by name containment,
    /// so "iTerm" also covers "iTerm2".
    pub blacklist: Vec<String>,
    /// When non-empty, only these apps are processed (exact, case-insensitive).
    pub whitelist: Vec<String>,
    /// Apps whose decisions always require human confirmation.
    pub require_confirmation: Vec<String>,
}

impl Default for AppsConfig {
    fn default() -> Self {
        Self {
            blacklist: vec![
                "Terminal".to_string(),
                "iTerm".to_string(),
                "Keychain Access".to_string(),
                "System Preferences".to_string(),
                "System Settings".to_string(),
                "Activity Monitor".to_string(),
                "Disk Utility".to_string(),
            ],
            whitelist: Vec::new(),
            require_confirmation: vec!["Finder".to_string(), "Mail".to_string()],
        }
    }
}

impl AppsConfig {
    /// Whether dialogs from `app` may be processed at all.
    pub fn is_allowed(&self, app: &str) -> bool {
        let app_lower = app.to_lowercase();
        if self
            .blacklist
            .iter()
            .any(|b| app_lower.contains(&b.to_lowercase()))
        {
            return false;
        }
        if self.whitelist.is_empty() {
            return true;
        }
        self.whitelist
            .iter()
            .any(|w| w.to_lowercase() == app_lower)
    }

    /// Whether decisions for `app` must be confirmed by a human.
    pub fn requires_confirmation(&self, app: &str) -> bool {
        let app_lower = app.to_lowercase();
        self.require_confirmation
            .iter()
            .any(|a| a.to_lowercase() == app_lower)
    }
}

// ─── Keyword Data ────────────────────────────────────────────────────────────

/// Keyword sets driving classification and the rule-based default.
///
/// The classifier sets carry localized variants (English, French, Turkish,
/// Spanish) because dialog text follows the system language, not the app's.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeywordsConfig {
    /// Save-confirmation markers, tested first.
    pub save: Vec<String>,
    /// Update-prompt markers.
    pub update: Vec<String>,
    /// Permission-request markers.
    pub permission: Vec<String>,
    /// Error-dialog markers, tested last.
    pub error: Vec<String>,
    /// Options the rule-based default is willing to pick with confirmation.
    pub prefer_safe: Vec<String>,
    /// Options the rule-based default refuses to pick on its own.
    pub cancel_like: Vec<String>,
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            save: string_vec(&[
                "save",
                "enregistrer",
                "kaydet",
                "guardar",
                "don't save",
                "ne pas enregistrer",
                "kaydetme",
            ]),
            update: string_vec(&["update", "mise à jour", "güncelleme", "actualizar"]),
            permission: string_vec(&[
                "allow",
                "autoriser",
                "izin ver",
                "permitir",
                "deny",
                "refuser",
                "reddet",
                "denegar",
            ]),
            error: string_vec(&["error", "erreur", "hata", "failed", "échec"]),
            prefer_safe: string_vec(&[
                "save",
                "confirm",
                "allow",
                "enregistrer",
                "autoriser",
                "guardar",
                "permitir",
                "kaydet",
            ]),
            cancel_like: string_vec(&[
                "cancel",
                "no",
                "deny",
                "don't",
                "not now",
                "annuler",
                "non",
                "refuser",
                "reddet",
                "denegar",
                "iptal",
            ]),
        }
    }
}

/// Data for the pattern strategies (command approval, auto-edit).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PatternsConfig {
    /// Command prefixes approved without deferring to a human.
    pub safe_commands: Vec<String>,
    /// Command fragments rejected outright.
    pub dangerous_commands: Vec<String>,
    /// Approve "edit automatically" prompts instead of declining them.
    pub auto_approve_edits: bool,
}

impl Default for PatternsConfig {
    fn default() -> Self {
        Self {
            safe_commands: string_vec(&[
                "cat", "ls", "pwd", "echo", "grep", "find", "wc", "head", "tail", "less",
                "more", "which", "whereis", "python", "node", "npm", "pip", "git status",
                "git log", "git diff", "curl", "wget",
            ]),
            dangerous_commands: string_vec(&[
                "rm -rf", "sudo", "chmod", "chown", "dd", "mkfs", "format", ">", ">>",
                "kill", "pkill", "killall",
            ]),
            auto_approve_edits: false,
        }
    }
}

fn string_vec(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ─── Top Level ───────────────────────────────────────────────────────────────

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub backends: BackendsConfig,
    pub apps: AppsConfig,
    pub keywords: KeywordsConfig,
    pub patterns: PatternsConfig,
}

impl PipelineConfig {
    /// Load from an explicit path.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let raw = std::fs::read_to_string(path).map_err(|e| PipelineError::Config {
            reason: format!("failed to read {}: {e}", path.display()),
        })?;
        let interpolated = interpolate_env(&raw);
        serde_yaml::from_str(&interpolated).map_err(|e| PipelineError::Config {
            reason: format!("failed to parse {}: {e}", path.display()),
        })
    }

    /// Discover a config file and load it, or fall back to defaults.
    ///
    /// Discovery order: `DIALOGPILOT_CONFIG`, then `dialogpilot.yaml` walking
    /// upward from the current directory. A missing file is not an error; a
    /// file that exists but fails to parse is.
    pub fn load_or_default() -> Result<Self, PipelineError> {
        match find_config_path() {
            Some(path) => {
                tracing::info!(path = %path.display(), "loading pipeline config");
                Self::load(&path)
            }
            None => {
                tracing::info!("no config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Locate the config file, if any.
fn find_config_path() -> Option<PathBuf> {
    if let Ok(explicit) = std::env::var(CONFIG_PATH_ENV) {
        let candidate = PathBuf::from(expand_tilde(&explicit));
        if candidate.exists() {
            return Some(candidate);
        }
    }

    let mut dir = std::env::current_dir().ok()?;
    loop {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.exists() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

// ─── Env-var Interpolation ───────────────────────────────────────────────────

/// Replace `${VAR}` and `${VAR:-default}` occurrences in the raw config text.
fn interpolate_env(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            out.push(ch);
            continue;
        }
        chars.next(); // consume '{'
        let mut expr = String::new();
        for c in chars.by_ref() {
            if c == '}' {
                break;
            }
            expr.push(c);
        }
        out.push_str(&resolve_env_expr(&expr));
    }

    out
}

/// Resolve `VAR` or `VAR:-default`, expanding `~` in defaults.
fn resolve_env_expr(expr: &str) -> String {
    match expr.split_once(":-") {
        Some((var, default)) => {
            std::env::var(var).unwrap_or_else(|_| expand_tilde(default))
        }
        None => std::env::var(expr).unwrap_or_default(),
    }
}

/// Expand a leading `~` to the home directory. Uses `dirs::home_dir()` so it
/// behaves on platforms where `$HOME` is unset.
fn expand_tilde(path: &str) -> String {
    match (path.strip_prefix('~'), dirs::home_dir()) {
        (Some(rest), Some(home)) => format!("{}{rest}", home.display()),
        _ => path.to_string(),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
