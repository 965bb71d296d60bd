//! Provider client wire-behavior tests
//!
//! Exercises the three HTTP clients against a mock server: status
//! mapping, the single retry on 5xx, header and body shape, and
//! citation parsing.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cforge_cs::providers::anthropic::AnthropicClient;
use cforge_cs::providers::perplexity::{PerplexityClient, ResearchDepth};
use cforge_cs::providers::xai::XaiClient;
use cforge_cs::providers::{ChatProvider, ChatRequest, ProviderError};

const TIMEOUT: Duration = Duration::from_secs(2);

fn request(prompt: &str) -> ChatRequest {
    ChatRequest {
        system: Some("You are terse.".to_string()),
        prompt: prompt.to_string(),
        temperature: 0.2,
        max_tokens: 100,
        model: None,
    }
}

#[tokio::test]
async fn test_anthropic_success_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": "pong"}],
            "usage": {"input_tokens": 5, "output_tokens": 1}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = AnthropicClient::new("test-key".to_string(), TIMEOUT)
        .with_base_url(server.uri());
    let completion = client.complete(&request("ping")).await.unwrap();
    assert_eq!(completion.text, "pong");
    assert_eq!(completion.usage.unwrap().output_tokens, 1);
}

#[tokio::test]
async fn test_anthropic_retries_5xx_once_then_succeeds() {
    let server = MockServer::start().await;
    // First call 503, second 200
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": "recovered"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = AnthropicClient::new("test-key".to_string(), TIMEOUT)
        .with_base_url(server.uri());
    let completion = client.complete(&request("ping")).await.unwrap();
    assert_eq!(completion.text, "recovered");
}

#[tokio::test]
async fn test_4xx_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .expect(1)
        .mount(&server)
        .await;

    let client = AnthropicClient::new("test-key".to_string(), TIMEOUT)
        .with_base_url(server.uri());
    let err = client.complete(&request("ping")).await.unwrap_err();
    match err {
        ProviderError::Api { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "bad key");
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_xai_sends_system_as_message_role() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "messages": [
                {"role": "system", "content": "You are terse."},
                {"role": "user", "content": "ping"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "pong"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = XaiClient::new("test-key".to_string(), TIMEOUT).with_base_url(server.uri());
    let completion = client.complete(&request("ping")).await.unwrap();
    assert_eq!(completion.text, "pong");
}

#[tokio::test]
async fn test_perplexity_citations_and_depth_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "sonar-pro"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "Key findings here."}}],
            "citations": ["https://example.org/study", "https://example.org/survey"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client =
        PerplexityClient::new("test-key".to_string(), TIMEOUT).with_base_url(server.uri());
    let mut req = request("latest research");
    req.model = Some(ResearchDepth::Deep.model().to_string());
    let completion = client.complete(&req).await.unwrap();
    assert_eq!(completion.text, "Key findings here.");
    assert_eq!(completion.citations.len(), 2);
    assert_eq!(completion.citations[0], "https://example.org/study");
}
