//! Generation backend error types.
//!
//! Every failure here is recoverable by design: the fallback coordinator
//! inspects the error, records it, and advances to the next identity. Only
//! [`BackendError::AllBackendsFailed`] reaches the decision resolver, and the
//! resolver treats it as "no decision from this path", never as a fault.

use thiserror::Error;

/// Errors from a single generation backend or from the fallback chain.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Backend is configured but cannot accept requests (no key, no server).
    #[error("{provider} unavailable: {reason}")]
    Unavailable {
        provider: String,
        reason: String,
    },

    /// TCP/HTTP connection to the provider endpoint failed.
    #[error("connection failed to {endpoint}: {reason}")]
    ConnectionFailed {
        endpoint: String,
        reason: String,
    },

    /// The provider did not reply within the per-backend budget.
    #[error("{provider} timed out after {duration_secs}s")]
    Timeout {
        provider: String,
        duration_secs: u64,
    },

    /// Non-2xx HTTP response from the provider.
    #[error("HTTP {status}: {body}")]
    Http {
        status: u16,
        body: String,
    },

    /// The reply arrived but did not have the expected shape.
    #[error("malformed response: {reason}")]
    MalformedResponse {
        reason: String,
    },

    /// Every identity in the fallback chain failed or was unavailable.
    #[error("no backend available (tried: {})", attempted.join(", "))]
    AllBackendsFailed {
        attempted: Vec<String>,
    },
}

impl BackendError {
    /// Whether this is the end-of-chain condition rather than a single
    /// backend's failure.
    pub fn is_exhaustion(&self) -> bool {
        matches!(self, BackendError::AllBackendsFailed { .. })
    }

    /// Map a `reqwest` send error to the right variant.
    pub(crate) fn from_send(
        provider: &str,
        endpoint: &str,
        timeout_secs: u64,
        error: reqwest::Error,
    ) -> Self {
        if error.is_timeout() {
            BackendError::Timeout {
                provider: provider.to_string(),
                duration_secs: timeout_secs,
            }
        } else {
            BackendError::ConnectionFailed {
                endpoint: endpoint.to_string(),
                reason: error.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_backends_failed_lists_attempts() {
        let err = BackendError::AllBackendsFailed {
            attempted: vec!["anthropic".to_string(), "ollama".to_string()],
        };
        assert_eq!(err.to_string(), "no backend available (tried: anthropic, ollama)");
        assert!(err.is_exhaustion());
    }

    #[test]
    fn test_single_failures_are_not_exhaustion() {
        let err = BackendError::Timeout {
            provider: "openai".to_string(),
            duration_secs: 30,
        };
        assert!(!err.is_exhaustion());
        assert!(err.to_string().contains("30s"));
    }
}
