//! Language-generation backends and the fallback chain.
//!
//! Submodules:
//! - `backend`: the `GenerationBackend` capability every provider implements
//! - `fallback`: ordered attempts across providers with per-backend timeouts
//! - `parser`: total parser from free-form replies to structured choices
//! - `ollama`, `openai`, `anthropic`, `gemini`: the concrete providers
//! - `types`, `errors`: shared identity and error types

pub mod anthropic;
pub mod backend;
pub mod errors;
pub mod fallback;
pub mod gemini;
pub mod ollama;
pub mod openai;
pub mod parser;
pub mod types;

// Re-exports for convenience
pub use anthropic::AnthropicBackend;
pub use backend::GenerationBackend;
pub use errors::BackendError;
pub use fallback::FallbackCoordinator;
pub use gemini::GeminiBackend;
pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;
pub use types::{ChoiceOutcome, ProviderKind};
