//! Ordered fallback across generation backends.
//!
//! The coordinator owns one instance per configured provider, in declared
//! priority order. An attempt walks the chain: skip unavailable identities,
//! invoke the rest under a per-backend timeout, return the first success.
//! A backend is never retried within one attempt; "retry" only ever means
//! advancing to the next identity. Worst-case latency is therefore bounded
//! by the sum of per-backend budgets.

use std::sync::Arc;
use std::time::Duration;

use crate::events::{EventBus, PipelineEvent};

use super::backend::GenerationBackend;
use super::errors::BackendError;
use super::types::{ChoiceOutcome, ProviderKind};

pub struct FallbackCoordinator {
    backends: Vec<Arc<dyn GenerationBackend>>,
    request_timeout: Duration,
    events: EventBus,
}

impl FallbackCoordinator {
    pub fn new(
        backends: Vec<Arc<dyn GenerationBackend>>,
        request_timeout: Duration,
        events: EventBus,
    ) -> Self {
        Self {
            backends,
            request_timeout,
            events,
        }
    }

    /// The configured chain, in attempt order.
    pub fn providers(&self) -> Vec<ProviderKind> {
        self.backends.iter().map(|b| b.kind()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Whether at least one backend would accept a request right now.
    pub async fn any_available(&self) -> bool {
        for backend in &self.backends {
            if backend.is_available().await {
                return true;
            }
        }
        false
    }

    /// Free-form generation through the chain.
    pub async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<(ProviderKind, String), BackendError> {
        let mut attempted = Vec::new();

        for backend in &self.backends {
            let provider = backend.kind();
            if self.skip_unavailable(backend.as_ref(), &mut attempted).await {
                continue;
            }

            let call = backend.generate(prompt, system_prompt);
            match tokio::time::timeout(self.request_timeout, call).await {
                Ok(Ok(text)) => {
                    tracing::debug!(provider = %provider, "generation succeeded");
                    return Ok((provider, text));
                }
                Ok(Err(error)) => self.record_failure(provider, error, &mut attempted),
                Err(_) => self.record_timeout(provider, &mut attempted),
            }
        }

        Err(BackendError::AllBackendsFailed { attempted })
    }

    /// Structured choice generation through the chain.
    pub async fn generate_choice(
        &self,
        prompt: &str,
        options: &[String],
        system_prompt: Option<&str>,
    ) -> Result<(ProviderKind, ChoiceOutcome), BackendError> {
        let mut attempted = Vec::new();

        for backend in &self.backends {
            let provider = backend.kind();
            if self.skip_unavailable(backend.as_ref(), &mut attempted).await {
                continue;
            }

            let call = backend.generate_choice(prompt, options, system_prompt);
            match tokio::time::timeout(self.request_timeout, call).await {
                Ok(Ok(outcome)) => {
                    tracing::debug!(
                        provider = %provider,
                        choice = %outcome.choice,
                        confidence = outcome.confidence,
                        "choice generation succeeded"
                    );
                    return Ok((provider, outcome));
                }
                Ok(Err(error)) => self.record_failure(provider, error, &mut attempted),
                Err(_) => self.record_timeout(provider, &mut attempted),
            }
        }

        Err(BackendError::AllBackendsFailed { attempted })
    }

    /// Returns true when `backend` should be skipped, recording the skip.
    async fn skip_unavailable(
        &self,
        backend: &dyn GenerationBackend,
        attempted: &mut Vec<String>,
    ) -> bool {
        if backend.is_available().await {
            return false;
        }
        let provider = backend.kind();
        tracing::debug!(provider = %provider, "backend unavailable, skipping");
        attempted.push(format!("{provider} (unavailable)"));
        true
    }

    fn record_failure(
        &self,
        provider: ProviderKind,
        error: BackendError,
        attempted: &mut Vec<String>,
    ) {
        tracing::warn!(provider = %provider, error = %error, "backend attempt failed");
        self.events.publish(PipelineEvent::BackendFailed {
            provider: provider.as_str().to_string(),
            error: error.to_string(),
        });
        attempted.push(provider.as_str().to_string());
    }

    fn record_timeout(&self, provider: ProviderKind, attempted: &mut Vec<String>) {
        let error = BackendError::Timeout {
            provider: provider.as_str().to_string(),
            duration_secs: self.request_timeout.as_secs(),
        };
        tracing::warn!(provider = %provider, error = %error, "backend attempt timed out");
        self.events.publish(PipelineEvent::BackendFailed {
            provider: provider.as_str().to_string(),
            error: error.to_string(),
        });
        attempted.push(provider.as_str().to_string());
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
