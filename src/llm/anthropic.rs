//! Anthropic messages-API backend.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AnthropicConfig;

use super::backend::GenerationBackend;
use super::errors::BackendError;
use super::types::ProviderKind;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";

/// Pinned API revision, sent on every request.
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicBackend {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    timeout_secs: u64,
}

// ─── Wire Types ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

// ─── Backend ─────────────────────────────────────────────────────────────────

impl AnthropicBackend {
    pub fn new(config: &AnthropicConfig, request_timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| BackendError::ConnectionFailed {
                endpoint: MESSAGES_URL.to_string(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_key: config.resolve_key(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            timeout_secs: request_timeout.as_secs(),
        })
    }
}

#[async_trait]
impl GenerationBackend for AnthropicBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    async fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn choice_confidence(&self) -> f32 {
        0.95
    }

    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<String, BackendError> {
        let key = self.api_key.as_ref().ok_or_else(|| BackendError::Unavailable {
            provider: "anthropic".to_string(),
            reason: "no API key configured".to_string(),
        })?;

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: system_prompt,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::from_send("anthropic", MESSAGES_URL, self.timeout_secs, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse =
            response
                .json()
                .await
                .map_err(|e| BackendError::MalformedResponse {
                    reason: format!("anthropic messages response: {e}"),
                })?;

        let text = parsed
            .content
            .into_iter()
            .map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");
        if text.is_empty() {
            return Err(BackendError::MalformedResponse {
                reason: "anthropic reply carried no text blocks".to_string(),
            });
        }
        Ok(text)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
