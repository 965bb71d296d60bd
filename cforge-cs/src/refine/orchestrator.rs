//! Refinement run orchestration
//!
//! Drives the iteration loop over one stored document. Provider
//! roles are fixed: the trends and research providers feed auxiliary
//! context into the primary provider's prompt; only the primary
//! provider's output is merged into the document.
//!
//! Iteration schedule:
//! - Iteration 1: trends + research fanned out concurrently, both
//!   tolerated on failure
//! - Iteration 2: trends only (creative suggestions)
//! - Iteration 3+: primary only
//!
//! The store is written exactly once, after the last iteration, with a
//! version check against the version read at the start of the run. A
//! cancelled run never writes.

use serde_json::{json, Value};
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use cforge_common::models::ContentDocument;

use crate::db;
use crate::extract;
use crate::prompts;
use crate::providers::{ChatRequest, ProviderSet, SharedProvider};

use super::{
    stage_label, IterationLog, RefineError, RefineOutcome, RefineRequest, RefineState,
    MAX_ITERATIONS,
};

// Primary refinement calls carry the full document and get the large budget
const PRIMARY_TEMPERATURE: f32 = 0.7;
const PRIMARY_MAX_TOKENS: u32 = 16_000;

const TRENDS_TEMPERATURE: f32 = 0.7;
const TRENDS_CREATIVE_TEMPERATURE: f32 = 0.9;
const TRENDS_MAX_TOKENS: u32 = 2_000;
const TRENDS_CREATIVE_MAX_TOKENS: u32 = 1_500;

const RESEARCH_TEMPERATURE: f32 = 0.2;
const RESEARCH_MAX_TOKENS: u32 = 2_000;

pub struct Orchestrator {
    db: SqlitePool,
    providers: ProviderSet,
}

impl Orchestrator {
    pub fn new(db: SqlitePool, providers: ProviderSet) -> Self {
        Self { db, providers }
    }

    /// Run a full refinement. Returns the per-iteration change log and
    /// the final document as persisted.
    pub async fn run(
        &self,
        request: RefineRequest,
        cancel: CancellationToken,
    ) -> Result<RefineOutcome, RefineError> {
        if request.iterations == 0 || request.iterations > MAX_ITERATIONS {
            return Err(RefineError::InvalidParameters(format!(
                "iterations must be between 1 and {}",
                MAX_ITERATIONS
            )));
        }
        let total = request.iterations;

        let mut state = RefineState::FetchingDocument;
        debug!(?state, document_id = %request.document_id, "Starting refinement run");

        // Fetched before any provider call; an unknown id costs nothing
        let mut working = db::get_document(&self.db, request.kind, request.document_id)
            .await
            .map_err(RefineError::Store)?
            .ok_or_else(|| {
                RefineError::NotFound(format!(
                    "{} {} not found",
                    request.kind, request.document_id
                ))
            })?;
        let expected_version = working.version();

        let mut change_log = Vec::with_capacity(total as usize);

        for iteration in 1..=total {
            if cancel.is_cancelled() {
                info!(iteration, "Refinement run cancelled before iteration");
                return Err(RefineError::Cancelled);
            }
            state = RefineState::Iterating(iteration);
            info!(
                ?state,
                total,
                stage = stage_label(iteration),
                "Starting refinement iteration"
            );

            let (trends, research) = self
                .auxiliary_context(&working, iteration, &request)
                .await;

            if cancel.is_cancelled() {
                info!(iteration, "Refinement run cancelled after auxiliary calls");
                return Err(RefineError::Cancelled);
            }

            let pair = prompts::refinement_prompts(&working, iteration, total, &request.options);
            let mut prompt = pair.user;
            if !trends.is_null() {
                prompt.push_str(&format!(
                    "\n\nCurrent trends and context to incorporate:\n{}",
                    trends
                ));
            }
            if !research.is_null() {
                prompt.push_str(&format!("\n\nResearch findings to draw on:\n{}", research));
            }

            let completion = self
                .providers
                .primary
                .complete(&ChatRequest {
                    system: Some(pair.system),
                    prompt,
                    temperature: PRIMARY_TEMPERATURE,
                    max_tokens: PRIMARY_MAX_TOKENS,
                    model: None,
                })
                .await
                .map_err(RefineError::Primary)?;

            let value = extract::extract_json(&completion.text).ok_or_else(|| {
                RefineError::ParseFailure(format!(
                    "iteration {} reply contained no JSON object",
                    iteration
                ))
            })?;

            let patch = super::merge::DocumentPatch::from_value(request.kind, &value);
            if patch.is_empty() {
                debug!(iteration, "Refinement reply carried no content fields");
            }
            patch.apply_to(&mut working);

            change_log.push(IterationLog {
                iteration,
                stage_label: stage_label(iteration).to_string(),
                summary: patch
                    .changes_summary()
                    .unwrap_or("No summary reported")
                    .to_string(),
                trends,
                research,
                timestamp: chrono::Utc::now(),
            });
        }

        if cancel.is_cancelled() {
            info!("Refinement run cancelled before persisting");
            return Err(RefineError::Cancelled);
        }

        state = RefineState::Persisting;
        debug!(?state, version = expected_version, "Writing refined document");
        db::update_document_checked(&self.db, &working, expected_version)
            .await
            .map_err(RefineError::Store)?;
        // Reflect the write's version bump in the returned document
        match &mut working {
            ContentDocument::Book(b) => b.version = expected_version + 1,
            ContentDocument::Course(c) => c.version = expected_version + 1,
        }

        state = RefineState::Done;
        info!(
            ?state,
            document_id = %request.document_id,
            iterations = change_log.len(),
            "Refinement run complete"
        );
        Ok(RefineOutcome {
            change_log,
            final_document: working,
        })
    }

    /// Gather auxiliary provider contributions for this iteration.
    /// Failures never abort the run; they surface as an `error` field
    /// in the returned value.
    async fn auxiliary_context(
        &self,
        doc: &ContentDocument,
        iteration: u32,
        request: &RefineRequest,
    ) -> (Value, Value) {
        let audience = request
            .options
            .audience
            .as_deref()
            .unwrap_or("general learners");

        match iteration {
            1 => {
                let trends_pair =
                    prompts::trends_prompts(doc.topic(), request.kind, iteration, audience);
                let research_pair = prompts::research_prompts(&format!(
                    "Latest developments, statistics, and expert insights on: {}",
                    doc.topic()
                ));

                let trends_defaults = [("trending_topics", json!([]))];
                let research_defaults = [("key_facts", json!([]))];
                let trends_call = call_tolerant(
                    &self.providers.trends,
                    ChatRequest {
                        system: Some(trends_pair.system),
                        prompt: trends_pair.user,
                        temperature: TRENDS_TEMPERATURE,
                        max_tokens: TRENDS_MAX_TOKENS,
                        model: None,
                    },
                    &trends_defaults,
                );
                let research_call = call_tolerant(
                    &self.providers.research,
                    ChatRequest {
                        system: Some(research_pair.system),
                        prompt: research_pair.user,
                        temperature: RESEARCH_TEMPERATURE,
                        max_tokens: RESEARCH_MAX_TOKENS,
                        model: None,
                    },
                    &research_defaults,
                );

                tokio::join!(trends_call, research_call)
            }
            2 => {
                let trends_pair =
                    prompts::trends_prompts(doc.topic(), request.kind, iteration, audience);
                let trends = call_tolerant(
                    &self.providers.trends,
                    ChatRequest {
                        system: Some(trends_pair.system),
                        prompt: trends_pair.user,
                        temperature: TRENDS_CREATIVE_TEMPERATURE,
                        max_tokens: TRENDS_CREATIVE_MAX_TOKENS,
                        model: None,
                    },
                    &[("creative_suggestions", json!([]))],
                )
                .await;
                (trends, Value::Null)
            }
            _ => (Value::Null, Value::Null),
        }
    }
}

/// Call an auxiliary provider; a failure becomes `{"error": ...}`
async fn call_tolerant(
    provider: &SharedProvider,
    request: ChatRequest,
    defaults: &[(&str, Value)],
) -> Value {
    match provider.complete(&request).await {
        Ok(completion) => extract::extract_or_raw(&completion.text, defaults),
        Err(e) => {
            warn!(provider = provider.name(), error = %e, "Auxiliary provider call failed");
            json!({ "error": e.to_string() })
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use uuid::Uuid;

    use cforge_common::models::{Book, ContentKind};

    use crate::providers::{ChatProvider, Completion, ProviderError};
    use crate::refine::RefineOptions;

    /// Returns a fixed reply for every call and counts invocations
    struct FixedProvider {
        name: &'static str,
        reply: Result<String, ProviderError>,
        calls: AtomicUsize,
    }

    impl FixedProvider {
        fn ok(name: &'static str, text: &str) -> Arc<Self> {
            Arc::new(Self {
                name,
                reply: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                reply: Err(ProviderError::Api {
                    status: 500,
                    body: "upstream boom".to_string(),
                }),
                calls: AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatProvider for FixedProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn complete(&self, _request: &ChatRequest) -> Result<Completion, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(text) => Ok(Completion {
                    text: text.clone(),
                    usage: None,
                    citations: Vec::new(),
                }),
                Err(ProviderError::Api { status, body }) => Err(ProviderError::Api {
                    status: *status,
                    body: body.clone(),
                }),
                Err(_) => unreachable!(),
            }
        }
    }

    /// Bumps the stored row's version before replying, to race the run
    struct VersionBumpProvider {
        pool: SqlitePool,
        book_id: Uuid,
        reply: String,
    }

    #[async_trait]
    impl ChatProvider for VersionBumpProvider {
        fn name(&self) -> &'static str {
            "version-bump"
        }

        async fn complete(&self, _request: &ChatRequest) -> Result<Completion, ProviderError> {
            sqlx::query("UPDATE books SET version = version + 1 WHERE id = ?")
                .bind(self.book_id.to_string())
                .execute(&self.pool)
                .await
                .map_err(|e| ProviderError::Network(e.to_string()))?;
            Ok(Completion {
                text: self.reply.clone(),
                usage: None,
                citations: Vec::new(),
            })
        }
    }

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        db::init_tables(&pool).await.unwrap();
        pool
    }

    async fn seed_book(pool: &SqlitePool) -> Book {
        let mut book = Book::new(
            "author@example.com".to_string(),
            "Test Book".to_string(),
            "testing".to_string(),
            "beginner".to_string(),
        );
        book.subtitle = Some("A test subtitle".to_string());
        db::books::create_book(pool, &book).await.unwrap();
        book
    }

    fn providers(
        primary: Arc<FixedProvider>,
        trends: Arc<FixedProvider>,
        research: Arc<FixedProvider>,
    ) -> ProviderSet {
        ProviderSet {
            primary,
            trends,
            research,
        }
    }

    fn request(id: Uuid, iterations: u32) -> RefineRequest {
        RefineRequest {
            document_id: id,
            kind: ContentKind::Book,
            iterations,
            options: RefineOptions::default(),
        }
    }

    const PRIMARY_REPLY: &str = r#"Here is the refined version:
{"title": "Refined Title", "changes_summary": "Polished the title"}
Hope this helps!"#;

    #[tokio::test]
    async fn test_run_merges_and_persists_once() {
        let pool = test_pool().await;
        let book = seed_book(&pool).await;

        let primary = FixedProvider::ok("primary", PRIMARY_REPLY);
        let trends = FixedProvider::ok("trends", r#"{"trending_topics": ["property testing"]}"#);
        let research = FixedProvider::ok("research", r#"{"key_facts": ["fact one"]}"#);
        let orch = Orchestrator::new(
            pool.clone(),
            providers(primary.clone(), trends.clone(), research.clone()),
        );

        let outcome = orch
            .run(request(book.id, 3), CancellationToken::new())
            .await
            .unwrap();

        // Exactly one change-log entry per iteration
        assert_eq!(outcome.change_log.len(), 3);
        assert_eq!(outcome.change_log[0].iteration, 1);
        assert_eq!(outcome.change_log[0].summary, "Polished the title");
        // Iteration 1 carries both auxiliary contributions
        assert!(outcome.change_log[0].trends.get("trending_topics").is_some());
        assert!(outcome.change_log[0].research.get("key_facts").is_some());
        // Iteration 2 is trends-only, iteration 3 is primary-only
        assert!(outcome.change_log[1].research.is_null());
        assert!(outcome.change_log[2].trends.is_null());
        assert!(outcome.change_log[2].research.is_null());

        assert_eq!(primary.call_count(), 3);
        assert_eq!(trends.call_count(), 2);
        assert_eq!(research.call_count(), 1);

        // Merged fields persisted, untouched fields preserved
        let stored = db::books::get_book(&pool, book.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Refined Title");
        assert_eq!(stored.subtitle.as_deref(), Some("A test subtitle"));
        assert_eq!(stored.version, book.version + 1);
        assert_eq!(outcome.final_document.version(), stored.version);
    }

    #[tokio::test]
    async fn test_auxiliary_failure_is_tolerated() {
        let pool = test_pool().await;
        let book = seed_book(&pool).await;

        let primary = FixedProvider::ok("primary", PRIMARY_REPLY);
        let trends = FixedProvider::failing("trends");
        let research = FixedProvider::failing("research");
        let orch = Orchestrator::new(pool.clone(), providers(primary, trends, research));

        let outcome = orch
            .run(request(book.id, 2), CancellationToken::new())
            .await
            .unwrap();

        // Failures surface in the log, never abort the run
        assert!(outcome.change_log[0].trends.get("error").is_some());
        assert!(outcome.change_log[0].research.get("error").is_some());
        assert_eq!(outcome.final_document.title(), "Refined Title");
    }

    #[tokio::test]
    async fn test_primary_failure_aborts_without_writing() {
        let pool = test_pool().await;
        let book = seed_book(&pool).await;

        let primary = FixedProvider::failing("primary");
        let trends = FixedProvider::ok("trends", "{}");
        let research = FixedProvider::ok("research", "{}");
        let orch = Orchestrator::new(pool.clone(), providers(primary, trends, research));

        let err = orch
            .run(request(book.id, 3), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RefineError::Primary(_)));

        let stored = db::books::get_book(&pool, book.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Test Book");
        assert_eq!(stored.version, book.version);
    }

    #[tokio::test]
    async fn test_unknown_document_fails_before_provider_calls() {
        let pool = test_pool().await;

        let primary = FixedProvider::ok("primary", PRIMARY_REPLY);
        let trends = FixedProvider::ok("trends", "{}");
        let research = FixedProvider::ok("research", "{}");
        let orch = Orchestrator::new(
            pool,
            providers(primary.clone(), trends.clone(), research.clone()),
        );

        let err = orch
            .run(request(Uuid::new_v4(), 3), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RefineError::NotFound(_)));
        assert_eq!(primary.call_count(), 0);
        assert_eq!(trends.call_count(), 0);
        assert_eq!(research.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unparseable_primary_reply_is_fatal() {
        let pool = test_pool().await;
        let book = seed_book(&pool).await;

        let primary = FixedProvider::ok("primary", "I could not produce JSON, sorry.");
        let trends = FixedProvider::ok("trends", "{}");
        let research = FixedProvider::ok("research", "{}");
        let orch = Orchestrator::new(pool.clone(), providers(primary, trends, research));

        let err = orch
            .run(request(book.id, 1), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RefineError::ParseFailure(_)));

        let stored = db::books::get_book(&pool, book.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Test Book");
    }

    #[tokio::test]
    async fn test_cancelled_run_never_writes() {
        let pool = test_pool().await;
        let book = seed_book(&pool).await;

        let primary = FixedProvider::ok("primary", PRIMARY_REPLY);
        let trends = FixedProvider::ok("trends", "{}");
        let research = FixedProvider::ok("research", "{}");
        let orch = Orchestrator::new(
            pool.clone(),
            providers(primary.clone(), trends, research),
        );

        let token = CancellationToken::new();
        token.cancel();
        let err = orch.run(request(book.id, 3), token).await.unwrap_err();
        assert!(matches!(err, RefineError::Cancelled));
        assert_eq!(primary.call_count(), 0);

        let stored = db::books::get_book(&pool, book.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Test Book");
        assert_eq!(stored.version, book.version);
    }

    #[tokio::test]
    async fn test_concurrent_version_bump_yields_conflict() {
        let pool = test_pool().await;
        let book = seed_book(&pool).await;

        // Primary provider bumps the stored version mid-run, so the
        // final write sees a stale expected version
        let primary = Arc::new(VersionBumpProvider {
            pool: pool.clone(),
            book_id: book.id,
            reply: PRIMARY_REPLY.to_string(),
        });
        let trends = FixedProvider::ok("trends", "{}");
        let research = FixedProvider::ok("research", "{}");
        let orch = Orchestrator::new(
            pool.clone(),
            ProviderSet {
                primary,
                trends,
                research,
            },
        );

        let err = orch
            .run(request(book.id, 1), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RefineError::Store(cforge_common::Error::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_iteration_bounds_rejected() {
        let pool = test_pool().await;
        let primary = FixedProvider::ok("primary", PRIMARY_REPLY);
        let trends = FixedProvider::ok("trends", "{}");
        let research = FixedProvider::ok("research", "{}");
        let orch = Orchestrator::new(pool, providers(primary, trends, research));

        let err = orch
            .run(request(Uuid::new_v4(), 0), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RefineError::InvalidParameters(_)));

        let err = orch
            .run(
                request(Uuid::new_v4(), MAX_ITERATIONS + 1),
                CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RefineError::InvalidParameters(_)));
    }
}
