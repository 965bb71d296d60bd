//! End-to-end refinement workflow tests
//!
//! Drives POST /api/content/refine through the full router with all
//! three provider endpoints served by wiremock. Covers the merge of the
//! primary result, tolerated auxiliary failures, fatal primary
//! failures, and the fail-fast document check.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::json;
use tower::util::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cforge_common::models::{Book, Chapter};
use cforge_cs::providers::anthropic::AnthropicClient;
use cforge_cs::providers::perplexity::PerplexityClient;
use cforge_cs::providers::xai::XaiClient;
use cforge_cs::providers::ProviderSet;
use cforge_cs::{db, AppState};

const TOKEN: &str = "author-token";

struct TestHarness {
    app: axum::Router,
    pool: sqlx::SqlitePool,
    primary: MockServer,
    trends: MockServer,
    research: MockServer,
}

async fn harness() -> TestHarness {
    let pool = sqlx::SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    db::init_tables(&pool).await.expect("Failed to init tables");
    db::users::upsert_user(&pool, "author@example.com", "author", TOKEN)
        .await
        .unwrap();

    let primary = MockServer::start().await;
    let trends = MockServer::start().await;
    let research = MockServer::start().await;

    let timeout = Duration::from_secs(2);
    let providers = ProviderSet {
        primary: Arc::new(
            AnthropicClient::new("test-key".to_string(), timeout).with_base_url(primary.uri()),
        ),
        trends: Arc::new(
            XaiClient::new("test-key".to_string(), timeout).with_base_url(trends.uri()),
        ),
        research: Arc::new(
            PerplexityClient::new("test-key".to_string(), timeout).with_base_url(research.uri()),
        ),
    };

    let app = cforge_cs::build_router(AppState::new(pool.clone(), providers));
    TestHarness {
        app,
        pool,
        primary,
        trends,
        research,
    }
}

fn anthropic_reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "msg_01",
        "content": [{"type": "text", "text": text}],
        "usage": {"input_tokens": 10, "output_tokens": 10}
    }))
}

fn openai_reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{"message": {"role": "assistant", "content": text}}],
        "usage": {"prompt_tokens": 10, "completion_tokens": 10, "total_tokens": 20}
    }))
}

async fn seed_book(pool: &sqlx::SqlitePool) -> Book {
    let mut book = Book::new(
        "author@example.com".to_string(),
        "Sourdough Basics".to_string(),
        "baking".to_string(),
        "beginner".to_string(),
    );
    book.chapters = vec![Chapter {
        chapter_number: 1,
        title: "Starters".to_string(),
        content: "Flour and water.".to_string(),
        key_takeaways: vec!["feed daily".to_string()],
        images: Vec::new(),
    }];
    db::books::create_book(pool, &book).await.unwrap();
    book
}

fn refine_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/content/refine")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", TOKEN))
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_refine_merges_primary_result_into_store() {
    let h = harness().await;
    let book = seed_book(&h.pool).await;

    let primary_text = r#"Here is the refined book:
{"title": "Sourdough, Mastered", "changes_summary": "Sharper title, tightened chapter one"}
Let me know if you need more."#;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(anthropic_reply(primary_text))
        .expect(3)
        .mount(&h.primary)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(openai_reply(r#"{"trending_topics": ["no-knead methods"]}"#))
        .expect(2)
        .mount(&h.trends)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(openai_reply(r#"{"key_facts": ["hydration matters"]}"#))
        .expect(1)
        .mount(&h.research)
        .await;

    let response = h
        .app
        .oneshot(refine_request(json!({
            "content_id": book.id,
            "content_type": "book",
            "iterations": 3,
            "refinement_goals": "make it memorable"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    // Exactly one change-log entry per iteration, numbered from 1
    let changes = json["changes_log"].as_array().unwrap();
    assert_eq!(changes.len(), 3);
    for (i, entry) in changes.iter().enumerate() {
        assert_eq!(entry["iteration"], (i + 1) as u64);
        assert_eq!(entry["summary"], "Sharper title, tightened chapter one");
    }
    assert_eq!(
        changes[0]["trends"]["trending_topics"][0],
        "no-knead methods"
    );
    assert_eq!(changes[0]["research"]["key_facts"][0], "hydration matters");

    assert_eq!(json["refined_content"]["title"], "Sourdough, Mastered");

    // Merged result persisted; untouched fields survive; version moved
    let stored = db::books::get_book(&h.pool, book.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Sourdough, Mastered");
    assert_eq!(stored.topic, "baking");
    assert_eq!(stored.chapters[0].title, "Starters");
    assert_eq!(stored.version, book.version + 1);
}

#[tokio::test]
async fn test_trends_failure_is_logged_not_fatal() {
    let h = harness().await;
    let book = seed_book(&h.pool).await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(anthropic_reply(
            r#"{"title": "Still Refined", "changes_summary": "ok"}"#,
        ))
        .mount(&h.primary)
        .await;
    // Trends returns 403: not retryable, tolerated
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(403).set_body_string("key revoked"))
        .mount(&h.trends)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(openai_reply(r#"{"key_facts": []}"#))
        .mount(&h.research)
        .await;

    let response = h
        .app
        .oneshot(refine_request(json!({
            "content_id": book.id,
            "content_type": "book",
            "iterations": 1
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let entry = &json["changes_log"][0];
    assert!(entry["trends"]["error"].as_str().unwrap().contains("403"));

    let stored = db::books::get_book(&h.pool, book.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Still Refined");
}

#[tokio::test]
async fn test_primary_5xx_after_retry_is_fatal_and_store_unchanged() {
    let h = harness().await;
    let book = seed_book(&h.pool).await;

    // One retry on 5xx, so the mock sees exactly two calls
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(2)
        .mount(&h.primary)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(openai_reply("{}"))
        .mount(&h.trends)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(openai_reply("{}"))
        .mount(&h.research)
        .await;

    let response = h
        .app
        .oneshot(refine_request(json!({
            "content_id": book.id,
            "content_type": "book",
            "iterations": 2
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "UPSTREAM_PROVIDER_FAILURE");

    let stored = db::books::get_book(&h.pool, book.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Sourdough Basics");
    assert_eq!(stored.version, book.version);
}

#[tokio::test]
async fn test_unknown_document_makes_zero_provider_calls() {
    let h = harness().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(anthropic_reply("{}"))
        .expect(0)
        .mount(&h.primary)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(openai_reply("{}"))
        .expect(0)
        .mount(&h.trends)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(openai_reply("{}"))
        .expect(0)
        .mount(&h.research)
        .await;

    let response = h
        .app
        .oneshot(refine_request(json!({
            "content_id": uuid::Uuid::new_v4(),
            "content_type": "book",
            "iterations": 3
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_protected_document_can_be_refined() {
    let h = harness().await;
    let mut book = Book::new(
        "author@example.com".to_string(),
        "Locked Draft".to_string(),
        "baking".to_string(),
        "beginner".to_string(),
    );
    book.protected = true;
    db::books::create_book(&h.pool, &book).await.unwrap();

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(anthropic_reply(
            r#"{"title": "Protected but Refined", "changes_summary": "ok"}"#,
        ))
        .mount(&h.primary)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(openai_reply("{}"))
        .mount(&h.trends)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(openai_reply("{}"))
        .mount(&h.research)
        .await;

    let response = h
        .app
        .oneshot(refine_request(json!({
            "content_id": book.id,
            "content_type": "book",
            "iterations": 1
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let stored = db::books::get_book(&h.pool, book.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Protected but Refined");
    assert!(stored.protected);
}
