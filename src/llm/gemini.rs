//! Google Gemini backend.
//!
//! Uses the `generateContent` REST surface. The key travels in the
//! `x-goog-api-key` header rather than the query string so request URLs stay
//! safe to log.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::GeminiConfig;

use super::backend::GenerationBackend;
use super::errors::BackendError;
use super::types::ProviderKind;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const API_ROOT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    timeout_secs: u64,
}

// ─── Wire Types ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

// ─── Backend ─────────────────────────────────────────────────────────────────

impl GeminiBackend {
    pub fn new(config: &GeminiConfig, request_timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| BackendError::ConnectionFailed {
                endpoint: API_ROOT.to_string(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_key: config.resolve_key(),
            model: config.model.clone(),
            timeout_secs: request_timeout.as_secs(),
        })
    }

    fn generate_url(&self) -> String {
        format!("{API_ROOT}/{}:generateContent", self.model)
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
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
            provider: "gemini".to_string(),
            reason: "no API key configured".to_string(),
        })?;

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            system_instruction: system_prompt.map(|text| Content {
                parts: vec![Part { text }],
            }),
        };

        let url = self.generate_url();
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", key)
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::from_send("gemini", &url, self.timeout_secs, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse =
            response
                .json()
                .await
                .map_err(|e| BackendError::MalformedResponse {
                    reason: format!("gemini generate response: {e}"),
                })?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        if text.is_empty() {
            return Err(BackendError::MalformedResponse {
                reason: "gemini reply carried no candidates".to_string(),
            });
        }
        Ok(text)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unavailable_without_key() {
        std::env::remove_var("GEMINI_API_KEY");
        let config = GeminiConfig {
            api_key: String::new(),
            ..GeminiConfig::default()
        };
        let backend = GeminiBackend::new(&config, Duration::from_secs(30)).unwrap();
        assert!(!backend.is_available().await);
    }

    #[test]
    fn test_generate_url_embeds_model() {
        let config = GeminiConfig {
            api_key: "test-key".to_string(),
            model: "gemini-2.0-flash-exp".to_string(),
        };
        let backend = GeminiBackend::new(&config, Duration::from_secs(30)).unwrap();
        assert_eq!(
            backend.generate_url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash-exp:generateContent"
        );
    }

    #[test]
    fn test_system_instruction_serialized_camel_case() {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: "hello" }],
            }],
            system_instruction: Some(Content {
                parts: vec![Part { text: "be brief" }],
            }),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"systemInstruction\""));
        assert!(json.contains("\"contents\""));
    }

    #[test]
    fn test_response_deserialization() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"1. Allow"}],"role":"model"},"finishReason":"STOP"}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.candidates[0].content.parts[0].text, "1. Allow");
    }
}
