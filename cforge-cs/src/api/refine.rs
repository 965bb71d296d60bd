//! Refinement endpoints
//!
//! # API Reference
//! - `POST /api/content/refine` — run a multi-iteration refinement on a
//!   stored document, returning the change log and the refined document
//! - `POST /api/content/refine/cancel/:run_id` — cancel a running
//!   refinement; the document is left untouched
//!
//! Each run registers a cancellation token in `AppState` under a fresh
//! run id. The run id is returned in the response so long-running
//! refinements started by another request can be cancelled.

use axum::extract::{Path, State};
use axum::{routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use cforge_common::models::{ContentDocument, ContentKind};

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::refine::{
    IterationLog, Orchestrator, RefineOptions, RefineRequest, DEFAULT_ITERATIONS,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RefineBody {
    pub content_id: Option<Uuid>,
    pub content_type: Option<ContentKind>,
    pub iterations: Option<u32>,
    pub refinement_goals: Option<String>,
    pub target_audience: Option<String>,
    pub tone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RefineResponse {
    pub run_id: Uuid,
    pub changes_log: Vec<IterationLog>,
    pub refined_content: ContentDocument,
}

/// POST /api/content/refine
///
/// Runs synchronously; the response carries the full change log.
/// Refinement is allowed on protected documents (protection only
/// forbids deletion).
pub async fn refine(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<RefineBody>,
) -> ApiResult<Json<RefineResponse>> {
    let content_id = body
        .content_id
        .ok_or_else(|| ApiError::BadRequest("content_id is required".to_string()))?;
    let content_type = body
        .content_type
        .ok_or_else(|| ApiError::BadRequest("content_type is required".to_string()))?;

    let request = RefineRequest {
        document_id: content_id,
        kind: content_type,
        iterations: body.iterations.unwrap_or(DEFAULT_ITERATIONS),
        options: RefineOptions {
            goals: body.refinement_goals,
            audience: body.target_audience,
            tone: body.tone,
        },
    };

    let run_id = Uuid::new_v4();
    let token = CancellationToken::new();
    state
        .cancellation_tokens
        .write()
        .await
        .insert(run_id, token.clone());

    info!(
        run_id = %run_id,
        content_id = %content_id,
        kind = %content_type,
        iterations = request.iterations,
        user = %user.0.email,
        "Starting refinement run"
    );

    let orchestrator = Orchestrator::new(state.db.clone(), state.providers.clone());
    let result = orchestrator.run(request, token).await;

    state.cancellation_tokens.write().await.remove(&run_id);

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            state.record_error(e.to_string()).await;
            return Err(e.into());
        }
    };

    Ok(Json(RefineResponse {
        run_id,
        changes_log: outcome.change_log,
        refined_content: outcome.final_document,
    }))
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub run_id: Uuid,
    pub cancelled: bool,
}

/// POST /api/content/refine/cancel/:run_id
///
/// Cancelling an unknown or already-finished run is not an error;
/// `cancelled` reports whether a live run was signalled.
pub async fn cancel_refine(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(run_id): Path<Uuid>,
) -> ApiResult<Json<CancelResponse>> {
    let cancelled = {
        let tokens = state.cancellation_tokens.read().await;
        match tokens.get(&run_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    };

    info!(run_id = %run_id, cancelled, "Refinement cancel requested");
    Ok(Json(CancelResponse { run_id, cancelled }))
}

/// Build refinement routes
pub fn refine_routes() -> Router<AppState> {
    Router::new()
        .route("/api/content/refine", post(refine))
        .route("/api/content/refine/cancel/:run_id", post(cancel_refine))
}
