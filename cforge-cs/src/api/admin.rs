//! Admin endpoints
//!
//! # API Reference
//! - `POST /api/admin/cleanup` — find (and optionally delete) invalid
//!   documents: missing title/topic or zero chapters/modules
//! - `POST /api/admin/audit` — probe the three provider endpoints and
//!   scan the store for invalid documents
//! - `POST /api/admin/settings` — store provider API keys in the
//!   database settings tier
//!
//! All routes require the `admin` role; authoring-role callers get 403.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use cforge_common::models::ContentKind;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::providers::{ChatRequest, SharedProvider};
use crate::{db, AppState};

// ============================================================================
// Cleanup
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CleanupRequest {
    /// Restrict to one kind; both kinds when absent
    pub content_type: Option<ContentKind>,
    /// Report only, delete nothing (the default)
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
}

fn default_dry_run() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct InvalidDocument {
    pub kind: ContentKind,
    pub id: Uuid,
    pub title: String,
    pub protected: bool,
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub dry_run: bool,
    pub found: Vec<InvalidDocument>,
    pub deleted: Vec<Uuid>,
}

/// POST /api/admin/cleanup
///
/// Protected documents are reported but never deleted, regardless of
/// `dry_run`.
pub async fn cleanup(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<CleanupRequest>,
) -> ApiResult<Json<CleanupResponse>> {
    user.require_admin()?;

    let found = scan_invalid(&state, body.content_type).await?;
    let mut deleted = Vec::new();

    if !body.dry_run {
        for doc in found.iter().filter(|d| !d.protected) {
            db::delete_document(&state.db, doc.kind, doc.id).await?;
            deleted.push(doc.id);
        }
        info!(
            admin = %user.0.email,
            found = found.len(),
            deleted = deleted.len(),
            "Cleanup deleted invalid documents"
        );
    }

    Ok(Json(CleanupResponse {
        dry_run: body.dry_run,
        found,
        deleted,
    }))
}

async fn scan_invalid(
    state: &AppState,
    kind: Option<ContentKind>,
) -> ApiResult<Vec<InvalidDocument>> {
    let mut found = Vec::new();

    if kind != Some(ContentKind::Course) {
        for book in db::books::list_books(&state.db).await? {
            if !book.is_valid_for_listing() {
                found.push(InvalidDocument {
                    kind: ContentKind::Book,
                    id: book.id,
                    title: book.title,
                    protected: book.protected,
                });
            }
        }
    }
    if kind != Some(ContentKind::Book) {
        for course in db::courses::list_courses(&state.db).await? {
            if !course.is_valid_for_listing() {
                found.push(InvalidDocument {
                    kind: ContentKind::Course,
                    id: course.id,
                    title: course.title,
                    protected: course.protected,
                });
            }
        }
    }
    Ok(found)
}

// ============================================================================
// Audit
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ProviderProbe {
    pub name: &'static str,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuditResponse {
    pub providers: Vec<ProviderProbe>,
    pub invalid_documents: Vec<InvalidDocument>,
}

/// POST /api/admin/audit
///
/// Probes all three providers concurrently with a minimal request and
/// scans both tables for invalid documents. Probe failures are
/// reported, not raised.
pub async fn audit(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<AuditResponse>> {
    user.require_admin()?;

    let (primary, trends, research) = tokio::join!(
        probe_provider(&state.providers.primary),
        probe_provider(&state.providers.trends),
        probe_provider(&state.providers.research),
    );
    let providers = vec![primary, trends, research];

    let invalid_documents = scan_invalid(&state, None).await?;

    info!(
        admin = %user.0.email,
        healthy = providers.iter().filter(|p| p.ok).count(),
        invalid = invalid_documents.len(),
        "Audit complete"
    );
    Ok(Json(AuditResponse {
        providers,
        invalid_documents,
    }))
}

async fn probe_provider(provider: &SharedProvider) -> ProviderProbe {
    let request = ChatRequest {
        system: None,
        prompt: "Reply with the single word: ok".to_string(),
        temperature: 0.0,
        max_tokens: 10,
        model: None,
    };
    match provider.complete(&request).await {
        Ok(_) => ProviderProbe {
            name: provider.name(),
            ok: true,
            error: None,
        },
        Err(e) => {
            warn!(provider = provider.name(), error = %e, "Provider probe failed");
            ProviderProbe {
                name: provider.name(),
                ok: false,
                error: Some(e.to_string()),
            }
        }
    }
}

// ============================================================================
// Settings
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SettingsRequest {
    pub claude_api_key: Option<String>,
    pub grok_api_key: Option<String>,
    pub perplexity_api_key: Option<String>,
}

/// POST /api/admin/settings
///
/// Writes provider keys to the database tier (highest resolution
/// priority). New keys are picked up at the next service start.
pub async fn update_settings(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<SettingsRequest>,
) -> ApiResult<Json<Value>> {
    user.require_admin()?;

    let mut updated = Vec::new();
    if let Some(key) = body.claude_api_key {
        db::settings::set_claude_api_key(&state.db, key).await?;
        updated.push("claude_api_key");
    }
    if let Some(key) = body.grok_api_key {
        db::settings::set_grok_api_key(&state.db, key).await?;
        updated.push("grok_api_key");
    }
    if let Some(key) = body.perplexity_api_key {
        db::settings::set_perplexity_api_key(&state.db, key).await?;
        updated.push("perplexity_api_key");
    }

    info!(admin = %user.0.email, ?updated, "Settings updated");
    Ok(Json(json!({ "updated": updated })))
}

/// Build admin routes
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/cleanup", post(cleanup))
        .route("/api/admin/audit", post(audit))
        .route("/api/admin/settings", post(update_settings))
}
