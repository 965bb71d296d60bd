//! Perplexity client ("research" provider)
//!
//! OpenAI-shaped chat completions endpoint with bearer auth, plus a
//! top-level `citations` array and search-control fields. Model choice
//! follows research depth: `sonar` for standard lookups, `sonar-pro`
//! for deep research.
//!
//! # API Reference
//! - Endpoint: https://api.perplexity.ai/chat/completions

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::{ChatProvider, ChatRequest, Completion, ProviderError, TokenUsage};

/// Perplexity API base URL
const PERPLEXITY_API_URL: &str = "https://api.perplexity.ai";

/// Standard research model
pub const DEFAULT_MODEL: &str = "sonar";

/// Deep research model
pub const DEEP_MODEL: &str = "sonar-pro";

/// Research depth selector exposed on the research endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResearchDepth {
    Standard,
    Deep,
}

impl ResearchDepth {
    pub fn model(&self) -> &'static str {
        match self {
            ResearchDepth::Standard => DEFAULT_MODEL,
            ResearchDepth::Deep => DEEP_MODEL,
        }
    }
}

/// Perplexity chat completions client
pub struct PerplexityClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
    return_citations: bool,
}

impl PerplexityClient {
    /// Create a client with the given key and per-call timeout
    pub fn new(api_key: String, timeout: Duration) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
            api_key,
            base_url: PERPLEXITY_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            return_citations: true,
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

    /// Disable the citations array in replies
    pub fn without_citations(mut self) -> Self {
        self.return_citations = false;
        self
    }

    async fn send_once(&self, request: &ChatRequest) -> Result<Completion, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

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
            top_p: 0.9,
            return_citations: self.return_citations,
            return_images: false,
            search_recency_filter: "month",
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(format!("Perplexity request failed: {}", e)))?;

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
            .map_err(|e| ProviderError::Parse(format!("Perplexity response: {}", e)))?;

        let text = reply
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::Parse("Perplexity reply had no choices".into()))?;

        Ok(Completion {
            text,
            usage: reply.usage.map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            }),
            citations: reply.citations,
        })
    }
}

#[async_trait]
impl ChatProvider for PerplexityClient {
    fn name(&self) -> &'static str {
        "Perplexity"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<Completion, ProviderError> {
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::MissingKey("Perplexity"));
        }

        debug!(
            model = request.model.as_deref().unwrap_or(&self.model),
            "Perplexity request"
        );

        match self.send_once(request).await {
            Err(e) if e.is_retryable() => {
                warn!(error = %e, "Perplexity 5xx, retrying once");
                self.send_once(request).await
            }
            other => other,
        }
    }
}

// ============================================================================
// Perplexity API Request/Response Types
// ============================================================================

#[derive(Serialize)]
struct ChatCompletionsRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    return_citations: bool,
    return_images: bool,
    search_recency_filter: &'a str,
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
    #[serde(default)]
    citations: Vec<String>,
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
