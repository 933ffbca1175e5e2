//! Pipeline-level error types.
//!
//! All errors implement `std::error::Error` via `thiserror`. Backend-specific
//! failures live in [`crate::llm::errors`]; this module covers setup and
//! configuration faults that stop the pipeline from being constructed at all.
//! Once running, the pipeline recovers from every per-dialog failure mode
//! internally and reports it through logs and events instead of errors.

use thiserror::Error;

/// Errors that can occur while constructing or configuring the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration file could not be read or parsed.
    #[error("config error: {reason}")]
    Config {
        reason: String,
    },

    /// A generation backend could not be constructed from its settings.
    #[error("backend setup failed for {provider}: {reason}")]
    BackendSetup {
        provider: String,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = PipelineError::Config {
            reason: "missing file".to_string(),
        };
        assert_eq!(err.to_string(), "config error: missing file");
    }

    #[test]
    fn test_backend_setup_display_names_provider() {
        let err = PipelineError::BackendSetup {
            provider: "ollama".to_string(),
            reason: "bad base url".to_string(),
        };
        assert!(err.to_string().contains("ollama"));
        assert!(err.to_string().contains("bad base url"));
    }
}
