//! OpenAI chat-completions backend.
//!
//! Also covers OpenAI-compatible gateways via the configurable base URL.
//! Availability is decided at construction time: a backend without a key
//! reports unavailable and is skipped by the coordinator.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::OpenAiConfig;

use super::backend::GenerationBackend;
use super::errors::BackendError;
use super::types::ProviderKind;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct OpenAiBackend {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    timeout_secs: u64,
}

// ─── Wire Types ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

// ─── Backend ─────────────────────────────────────────────────────────────────

impl OpenAiBackend {
    pub fn new(config: &OpenAiConfig, request_timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| BackendError::ConnectionFailed {
                endpoint: config.base_url.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_key: config.resolve_key(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_secs: request_timeout.as_secs(),
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Openai
    }

    async fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn choice_confidence(&self) -> f32 {
        0.9
    }

    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<String, BackendError> {
        let key = self.api_key.as_ref().ok_or_else(|| BackendError::Unavailable {
            provider: "openai".to_string(),
            reason: "no API key configured".to_string(),
        })?;

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_prompt {
            messages.push(Message {
                role: "system",
                content: system,
            });
        }
        messages.push(Message {
            role: "user",
            content: prompt,
        });

        let request = CompletionRequest {
            model: &self.model,
            messages,
            temperature: 0.2,
        };

        let url = self.completions_url();
        let response = self
            .client
            .post(&url)
            .bearer_auth(key)
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::from_send("openai", &url, self.timeout_secs, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse =
            response
                .json()
                .await
                .map_err(|e| BackendError::MalformedResponse {
                    reason: format!("openai completion response: {e}"),
                })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| BackendError::MalformedResponse {
                reason: "openai reply carried no choices".to_string(),
            })
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
