//! cforge-cs library interface for testing
//!
//! Exposes public APIs for integration testing

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod prompts;
pub mod providers;
pub mod refine;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::FromRef;
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::providers::ProviderSet;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// The three LLM provider clients
    pub providers: ProviderSet,
    /// Cancellation tokens for active refinement runs, keyed by run id
    pub cancellation_tokens: Arc<RwLock<HashMap<Uuid, CancellationToken>>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, providers: ProviderSet) -> Self {
        Self {
            db,
            providers,
            cancellation_tokens: Arc::new(RwLock::new(HashMap::new())),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Record an error string for the health endpoint
    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

// Lets the auth extractor borrow the pool without the full state
impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> SqlitePool {
        state.db.clone()
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::content_routes())
        .merge(api::refine_routes())
        .merge(api::recommendation_routes())
        .merge(api::admin_routes())
        .merge(api::health_routes())
        .with_state(state)
}
