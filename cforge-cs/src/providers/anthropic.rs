//! Anthropic client (primary/general provider)
//!
//! POSTs to the Messages API with `x-api-key` + `anthropic-version`
//! headers. The reply text lives in `content[0].text`; token usage in
//! `usage.input_tokens` / `usage.output_tokens`.
//!
//! This is the sole source of primary content generation: the refinement
//! orchestrator treats failures here as fatal for the whole run.
//!
//! # API Reference
//! - Endpoint: https://api.anthropic.com/v1/messages
//! - Version header: anthropic-version: 2023-06-01

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::{ChatProvider, ChatRequest, Completion, ProviderError, TokenUsage};

/// Anthropic Messages API base URL
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";

/// Required API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Default model for generation and refinement
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";

/// Anthropic Messages API client
pub struct AnthropicClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl AnthropicClient {
    /// Create a client with the given key and per-call timeout
    pub fn new(api_key: String, timeout: Duration) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
            api_key,
            base_url: ANTHROPIC_API_URL.to_string(),
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
        let url = format!("{}/v1/messages", self.base_url);
        let body = MessagesRequest {
            model: request.model.as_deref().unwrap_or(&self.model),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system.as_deref().filter(|s| !s.is_empty()),
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
        };

        let response = self
            .http_client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(format!("Anthropic request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let reply: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("Anthropic response: {}", e)))?;

        let text = reply
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| ProviderError::Parse("Anthropic reply had no text block".into()))?;

        Ok(Completion {
            text,
            usage: reply.usage.map(|u| TokenUsage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
            }),
            citations: Vec::new(),
        })
    }
}

#[async_trait]
impl ChatProvider for AnthropicClient {
    fn name(&self) -> &'static str {
        "Anthropic"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<Completion, ProviderError> {
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::MissingKey("Anthropic"));
        }

        debug!(
            model = request.model.as_deref().unwrap_or(&self.model),
            max_tokens = request.max_tokens,
            "Anthropic request"
        );

        match self.send_once(request).await {
            Err(e) if e.is_retryable() => {
                warn!(error = %e, "Anthropic 5xx, retrying once");
                self.send_once(request).await
            }
            other => other,
        }
    }
}

// ============================================================================
// Anthropic API Request/Response Types
// ============================================================================

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
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
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
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
            "id": "msg_01",
            "content": [{"type": "text", "text": "Hello."}],
            "model": "claude-3-5-sonnet-20241022",
            "usage": {"input_tokens": 12, "output_tokens": 4}
        }"#;
        let reply: MessagesResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(reply.content[0].text.as_deref(), Some("Hello."));
        assert_eq!(reply.usage.as_ref().unwrap().output_tokens, 4);
    }

    #[test]
    fn test_system_omitted_when_empty() {
        let body = MessagesRequest {
            model: DEFAULT_MODEL,
            max_tokens: 100,
            temperature: 0.7,
            system: None,
            messages: vec![Message {
                role: "user",
                content: "hi",
            }],
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("system"));
    }

    #[tokio::test]
    async fn test_missing_key_fails_fast() {
        let client = AnthropicClient::new(String::new(), Duration::from_secs(1));
        let err = client.complete(&ChatRequest::default()).await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingKey("Anthropic")));
    }

    // Live-wire behavior (status mapping, retry-on-5xx) is covered in
    // tests/provider_tests.rs with a mock HTTP server.
}
