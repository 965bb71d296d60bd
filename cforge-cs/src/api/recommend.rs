//! Recommendation endpoint
//!
//! Builds a learning profile from the caller's stored documents (topics,
//! levels, counts) and asks the primary provider for next-step
//! suggestions. A caller with no stored content still gets generic
//! recommendations.

use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::extract;
use crate::prompts;
use crate::providers::ChatRequest;
use crate::{db, AppState};

const RECOMMEND_TEMPERATURE: f32 = 0.6;
const RECOMMEND_MAX_TOKENS: u32 = 2_000;

/// POST /api/recommendations
pub async fn recommendations(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Value>> {
    let books = db::books::list_books(&state.db).await?;
    let courses = db::courses::list_courses(&state.db).await?;

    let mut topics: Vec<String> = Vec::new();
    let mut levels: Vec<String> = Vec::new();
    let mut book_count = 0usize;
    let mut course_count = 0usize;

    for book in books.iter().filter(|b| b.created_by == user.0.email) {
        book_count += 1;
        if !topics.contains(&book.topic) {
            topics.push(book.topic.clone());
        }
        if !levels.contains(&book.level) {
            levels.push(book.level.clone());
        }
    }
    for course in courses.iter().filter(|c| c.created_by == user.0.email) {
        course_count += 1;
        if !topics.contains(&course.topic) {
            topics.push(course.topic.clone());
        }
        if !levels.contains(&course.level) {
            levels.push(course.level.clone());
        }
    }

    let pair = prompts::recommendation_prompts(&topics, &levels, course_count, book_count);
    let completion = state
        .providers
        .primary
        .complete(&ChatRequest {
            system: None,
            prompt: pair.user,
            temperature: RECOMMEND_TEMPERATURE,
            max_tokens: RECOMMEND_MAX_TOKENS,
            model: None,
        })
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    let result = extract::extract_or_raw(
        &completion.text,
        &[
            ("recommendations", json!([])),
            ("skill_gaps", json!([])),
        ],
    );
    Ok(Json(result))
}

/// Build recommendation routes
pub fn recommendation_routes() -> Router<AppState> {
    Router::new().route("/api/recommendations", post(recommendations))
}
