//! xAI client ("trends" provider)
//!
//! OpenAI-shaped chat completions endpoint with bearer auth. Supplies
//! real-time trend context and creative suggestions; the orchestrator
//! tolerates failures here and records them in the iteration log instead
//! of aborting the run.
//!
//! # API Reference
//! - Endpoint: https://api.x.ai/v1/chat/completions

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::{ChatProvider, ChatRequest, Completion, ProviderError, TokenUsage};

/// xAI API base URL
const XAI_API_URL: &str = "https://api.x.ai";

/// Default trends model
pub const DEFAULT_MODEL: &str = "grok-beta";

/// xAI chat completions client
pub struct XaiClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl XaiClient {
    /// Create a client with the given key and per-call timeout
    pub fn new(api_key: String, timeout: Duration) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
            api_key,
            base_url: XAI_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Override the endpoint base URL (integration tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the default model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    async fn send_once(&self, request: &ChatRequest) -> Result<Completion, ProviderError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref().filter(|s| !s.is_empty()) {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        let body = ChatCompletionsRequest {
            model: request.model.as_deref().unwrap_or(&self.model),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(format!("xAI request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let reply: ChatCompletionsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("xAI response: {}", e)))?;

        let text = reply
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::Parse("xAI reply had no choices".into()))?;

        Ok(Completion {
            text,
            usage: reply.usage.map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            }),
            citations: Vec::new(),
        })
    }
}

#[async_trait]
impl ChatProvider for XaiClient {
    fn name(&self) -> &'static str {
        "xAI"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<Completion, ProviderError> {
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::MissingKey("xAI"));
        }

        debug!(
            model = request.model.as_deref().unwrap_or(&self.model),
            "xAI request"
        );

        match self.send_once(request).await {
            Err(e) if e.is_retryable() => {
                warn!(error = %e, "xAI 5xx, retrying once");
                self.send_once(request).await
            }
            other => other,
        }
    }
}

// ============================================================================
// xAI API Request/Response Types (OpenAI-shaped)
// ============================================================================

#[derive(Serialize)]
struct ChatCompletionsRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<Choice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_envelope_parses() {
        let raw = r#"{
            "choices": [{"message": {"role": "assistant", "content": "{\"trends\": []}"}}],
            "usage": {"prompt_tokens": 20, "completion_tokens": 8, "total_tokens": 28}
        }"#;
        let reply: ChatCompletionsResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(reply.choices[0].message.content, "{\"trends\": []}");
        assert_eq!(reply.usage.as_ref().unwrap().prompt_tokens, 20);
    }

    #[tokio::test]
    async fn test_missing_key_fails_fast() {
        let client = XaiClient::new("  ".into(), Duration::from_secs(1));
        let err = client.complete(&ChatRequest::default()).await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingKey("xAI")));
    }
}
