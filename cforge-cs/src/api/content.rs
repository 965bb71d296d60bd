//! Content authoring endpoints
//!
//! # API Reference
//! - `POST /api/content/generate` — author a new book or course
//! - `POST /api/content/brainstorm` — creative angles from the trends provider
//! - `POST /api/content/research` — grounded findings from the research provider
//! - `POST /api/content/summarize` — summarize a stored document
//! - `POST /api/content/edit` — free-text editor actions
//!
//! All routes require a bearer token. Request bodies are JSON;
//! missing required fields reject with 400 before any provider call.

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use cforge_common::models::{Book, ContentDocument, ContentKind, Course};

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::extract;
use crate::prompts::{
    self, EditAction, GenerationSpec, QuizMode, SummaryType, TargetLength,
};
use crate::providers::perplexity::ResearchDepth;
use crate::providers::ChatRequest;
use crate::refine::merge::DocumentPatch;
use crate::{db, AppState};

const GENERATION_TEMPERATURE: f32 = 0.8;
const GENERATION_MAX_TOKENS: u32 = 16_000;
const BRAINSTORM_TEMPERATURE: f32 = 0.9;
const BRAINSTORM_MAX_TOKENS: u32 = 2_000;
const RESEARCH_TEMPERATURE: f32 = 0.2;
const RESEARCH_MAX_TOKENS: u32 = 2_000;
const SUMMARY_TEMPERATURE: f32 = 0.3;
const SUMMARY_MAX_TOKENS: u32 = 2_000;
const EDIT_TEMPERATURE: f32 = 0.5;
const EDIT_MAX_TOKENS: u32 = 8_000;

// ============================================================================
// Generate
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub kind: Option<ContentKind>,
    pub topic: Option<String>,
    pub level: Option<String>,
    pub title: Option<String>,
    pub unique_twist: Option<String>,
    pub audience: Option<String>,
    pub target_length: Option<TargetLength>,
    pub quiz_mode: Option<QuizMode>,
    pub language: Option<String>,
    #[serde(default)]
    pub adult_content: bool,
    #[serde(default)]
    pub british_humor: bool,
}

/// POST /api/content/generate
///
/// Generates a complete draft with the primary provider and persists
/// it. The stored document's chapters/modules come from the provider
/// reply; the reply must contain a JSON object.
pub async fn generate(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<GenerateRequest>,
) -> ApiResult<Json<ContentDocument>> {
    let kind = body
        .kind
        .ok_or_else(|| ApiError::BadRequest("kind is required (book or course)".to_string()))?;
    let topic = non_empty(body.topic, "topic")?;
    let level = non_empty(body.level, "level")?;

    let spec = GenerationSpec {
        kind,
        topic: topic.clone(),
        title: body.title.clone(),
        level: level.clone(),
        unique_twist: body.unique_twist,
        audience: body.audience,
        target_length: body.target_length,
        quiz_mode: body.quiz_mode,
        language: body.language,
        adult_content: body.adult_content,
        british_humor: body.british_humor,
    };

    let pair = prompts::generation_prompts(&spec);
    let completion = state
        .providers
        .primary
        .complete(&ChatRequest {
            system: Some(pair.system),
            prompt: pair.user,
            temperature: GENERATION_TEMPERATURE,
            max_tokens: GENERATION_MAX_TOKENS,
            model: None,
        })
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    let value = extract::extract_json(&completion.text).ok_or_else(|| {
        ApiError::Upstream("Generation reply contained no JSON object".to_string())
    })?;

    let title = body.title.unwrap_or_else(|| topic.clone());
    let mut doc = match kind {
        ContentKind::Book => {
            let mut book = Book::new(user.0.email.clone(), title, topic, level);
            book.adult_content = body.adult_content;
            ContentDocument::Book(book)
        }
        ContentKind::Course => {
            let mut course = Course::new(user.0.email.clone(), title, topic, level);
            course.adult_content = body.adult_content;
            ContentDocument::Course(course)
        }
    };

    let patch = DocumentPatch::from_value(kind, &value);
    if patch.is_empty() {
        return Err(ApiError::Upstream(
            "Generation reply carried no content fields".to_string(),
        ));
    }
    patch.apply_to(&mut doc);

    match &doc {
        ContentDocument::Book(book) => db::books::create_book(&state.db, book).await?,
        ContentDocument::Course(course) => db::courses::create_course(&state.db, course).await?,
    }

    info!(kind = %kind, id = %doc.id(), created_by = %user.0.email, "Generated new document");
    Ok(Json(doc))
}

// ============================================================================
// Brainstorm
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct BrainstormRequest {
    pub topic: Option<String>,
    pub kind: Option<ContentKind>,
    pub level: Option<String>,
    pub current_angles: Option<String>,
    #[serde(default = "default_true")]
    pub include_real_time: bool,
}

fn default_true() -> bool {
    true
}

/// POST /api/content/brainstorm
pub async fn brainstorm(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(body): Json<BrainstormRequest>,
) -> ApiResult<Json<Value>> {
    let topic = non_empty(body.topic, "topic")?;

    let pair = prompts::brainstorm_prompts(
        &topic,
        body.kind,
        body.level.as_deref(),
        body.current_angles.as_deref(),
        body.include_real_time,
    );
    let completion = state
        .providers
        .trends
        .complete(&ChatRequest {
            system: Some(pair.system),
            prompt: pair.user,
            temperature: BRAINSTORM_TEMPERATURE,
            max_tokens: BRAINSTORM_MAX_TOKENS,
            model: None,
        })
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    let ideas = extract::extract_or_raw(
        &completion.text,
        &[
            ("unique_angles", json!([])),
            ("witty_hooks", json!([])),
            ("creative_formats", json!([])),
            ("engagement_ideas", json!([])),
        ],
    );
    Ok(Json(ideas))
}

// ============================================================================
// Research
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ResearchRequest {
    pub query: Option<String>,
    pub depth: Option<ResearchDepth>,
    #[serde(default = "default_true")]
    pub include_citations: bool,
}

/// POST /api/content/research
pub async fn research(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(body): Json<ResearchRequest>,
) -> ApiResult<Json<Value>> {
    let query = non_empty(body.query, "query")?;
    let depth = body.depth.unwrap_or(ResearchDepth::Standard);

    let pair = prompts::research_prompts(&query);
    let completion = state
        .providers
        .research
        .complete(&ChatRequest {
            system: Some(pair.system),
            prompt: pair.user,
            temperature: RESEARCH_TEMPERATURE,
            max_tokens: RESEARCH_MAX_TOKENS,
            model: Some(depth.model().to_string()),
        })
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    let findings = extract::extract_or_raw(&completion.text, &[("key_facts", json!([]))]);
    let citations = if body.include_citations {
        completion.citations
    } else {
        Vec::new()
    };
    Ok(Json(json!({
        "findings": findings,
        "citations": citations,
    })))
}

// ============================================================================
// Summarize
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub content_id: Option<Uuid>,
    pub content_type: Option<ContentKind>,
    pub summary_type: Option<SummaryType>,
}

/// POST /api/content/summarize
pub async fn summarize(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(body): Json<SummarizeRequest>,
) -> ApiResult<Json<Value>> {
    let id = body
        .content_id
        .ok_or_else(|| ApiError::BadRequest("content_id is required".to_string()))?;
    let kind = body
        .content_type
        .ok_or_else(|| ApiError::BadRequest("content_type is required".to_string()))?;
    let summary_type = body.summary_type.unwrap_or(SummaryType::Brief);

    let doc = db::get_document(&state.db, kind, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("{} {} not found", kind, id)))?;

    let pair = prompts::summary_prompts(&doc, summary_type);
    let completion = state
        .providers
        .primary
        .complete(&ChatRequest {
            system: None,
            prompt: pair.user,
            temperature: SUMMARY_TEMPERATURE,
            max_tokens: SUMMARY_MAX_TOKENS,
            model: None,
        })
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    let summary = extract::extract_or_raw(&completion.text, &[("summary", json!(""))]);
    Ok(Json(summary))
}

// ============================================================================
// Edit
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct EditRequest {
    pub action: Option<EditAction>,
    pub content: Option<String>,
    pub content_type: Option<String>,
    pub instructions: Option<String>,
}

/// POST /api/content/edit
///
/// Operates on free text, not on the store; the caller decides what to
/// do with the result.
pub async fn edit(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(body): Json<EditRequest>,
) -> ApiResult<Json<Value>> {
    let action = body
        .action
        .ok_or_else(|| ApiError::BadRequest("action is required".to_string()))?;
    let content = non_empty(body.content, "content")?;
    let content_type = body.content_type.as_deref().unwrap_or("text");

    let pair = prompts::edit_prompts(action, &content, content_type, body.instructions.as_deref());
    let completion = state
        .providers
        .primary
        .complete(&ChatRequest {
            system: Some(pair.system),
            prompt: pair.user,
            temperature: EDIT_TEMPERATURE,
            max_tokens: EDIT_MAX_TOKENS,
            model: None,
        })
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    // Structured actions (summarize) reply in JSON; the rest are plain text
    let result = match extract::extract_json(&completion.text) {
        Some(value) => value,
        None => json!({ "result": completion.text }),
    };
    Ok(Json(result))
}

fn non_empty(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{} is required", field)))
}

/// Build content authoring routes
pub fn content_routes() -> Router<AppState> {
    Router::new()
        .route("/api/content/generate", post(generate))
        .route("/api/content/brainstorm", post(brainstorm))
        .route("/api/content/research", post(research))
        .route("/api/content/summarize", post(summarize))
        .route("/api/content/edit", post(edit))
}
