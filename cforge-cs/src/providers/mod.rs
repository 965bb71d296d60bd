//! LLM gateway clients
//!
//! Three hosted text-generation providers, each with its own auth header
//! and wire shape, behind the common [`ChatProvider`] trait:
//! - Anthropic (primary/general): content generation and refinement
//! - xAI (trends): real-time context and creative injection
//! - Perplexity (research): cited background research
//!
//! Callers decide fatality: the refinement orchestrator treats a primary
//! failure as fatal and an auxiliary failure as "skip this provider's
//! contribution for this iteration".
//!
//! Every client applies a bounded per-call timeout and retries exactly
//! once on a 5xx response. Nothing else is retried.

pub mod anthropic;
pub mod perplexity;
pub mod xai;

pub use anthropic::AnthropicClient;
pub use perplexity::PerplexityClient;
pub use xai::XaiClient;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Default per-call timeout for provider requests
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// One text-generation request
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    /// Optional system prompt (providers that lack a dedicated system
    /// slot prepend it as a system-role message)
    pub system: Option<String>,
    /// User prompt text
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Override the client's default model for this call
    pub model: Option<String>,
}

/// Token usage counters from a provider reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Successful provider reply
#[derive(Debug, Clone)]
pub struct Completion {
    /// Generated text
    pub text: String,
    /// Token usage, when the provider reports it
    pub usage: Option<TokenUsage>,
    /// Source citations (research provider only; empty elsewhere)
    pub citations: Vec<String>,
}

/// Provider client errors
#[derive(Debug, Error)]
pub enum ProviderError {
    /// API key missing for this provider
    #[error("{0} API key not configured")]
    MissingKey(&'static str),

    /// Network communication error (connect, timeout, body read)
    #[error("Network error: {0}")]
    Network(String),

    /// Provider returned a non-2xx response
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// Failed to parse the provider's response envelope
    #[error("Parse error: {0}")]
    Parse(String),
}

impl ProviderError {
    /// 5xx responses get a single retry; everything else does not
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Api { status, .. } if *status >= 500)
    }
}

/// Common interface over the three hosted LLM providers
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Short provider name for logs and audit output
    fn name(&self) -> &'static str;

    /// Send one completion request
    async fn complete(&self, request: &ChatRequest) -> Result<Completion, ProviderError>;
}

/// Shared trait-object handle for injection into handlers and tests
pub type SharedProvider = Arc<dyn ChatProvider>;

/// The three providers the service orchestrates
#[derive(Clone)]
pub struct ProviderSet {
    /// General-purpose model; sole source of primary content generation
    pub primary: SharedProvider,
    /// Trends model (tolerated-failure auxiliary)
    pub trends: SharedProvider,
    /// Research model (tolerated-failure auxiliary)
    pub research: SharedProvider,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_5xx_is_retryable() {
        assert!(ProviderError::Api {
            status: 503,
            body: "overloaded".into()
        }
        .is_retryable());
        assert!(!ProviderError::Api {
            status: 429,
            body: "rate limited".into()
        }
        .is_retryable());
        assert!(!ProviderError::Network("timeout".into()).is_retryable());
        assert!(!ProviderError::Parse("bad envelope".into()).is_retryable());
        assert!(!ProviderError::MissingKey("Anthropic").is_retryable());
    }
}
