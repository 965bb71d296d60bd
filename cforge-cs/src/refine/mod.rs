//! Multi-iteration content refinement
//!
//! The orchestrator runs N sequential iterations over one stored
//! document. Each iteration builds iteration-specific prompts, fans out
//! to the auxiliary providers where the stage calls for it, invokes the
//! primary provider, extracts the structured result, shallow-merges it
//! into the working copy, and appends one change-log entry. The merged
//! document is written back once, at the end, with an optimistic
//! version check.
//!
//! # States
//! `Idle → FetchingDocument → Iterating(k=1..N) → Persisting → Done`,
//! with per-iteration sub-steps BuildingPrompt → InvokingProviders →
//! ExtractingResult → MergingDocument → LoggingChange.
//!
//! # Error Handling
//! - Auxiliary provider failures (trends/research) are recorded as an
//!   `error` field in the iteration log and never abort the run.
//! - Primary provider failure is fatal: the run errors and the store is
//!   not written.
//! - A parse failure of the primary reply is fatal too; the merge step
//!   requires structured fields.

pub mod merge;
pub mod orchestrator;

pub use orchestrator::Orchestrator;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use cforge_common::models::{ContentDocument, ContentKind};

use crate::error::ApiError;
use crate::providers::ProviderError;

/// Default iteration count when the caller does not specify one
pub const DEFAULT_ITERATIONS: u32 = 3;

/// Upper bound on iterations per run (each one costs provider calls)
pub const MAX_ITERATIONS: u32 = 10;

/// Caller-tunable refinement options; unknown fields are ignored
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefineOptions {
    /// Free-text refinement goals
    pub goals: Option<String>,
    /// Target audience description
    pub audience: Option<String>,
    /// Desired tone
    pub tone: Option<String>,
}

/// One refinement run request
#[derive(Debug, Clone)]
pub struct RefineRequest {
    pub document_id: Uuid,
    pub kind: ContentKind,
    pub iterations: u32,
    pub options: RefineOptions,
}

/// Orchestrator state (transient, for logging only)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefineState {
    Idle,
    FetchingDocument,
    Iterating(u32),
    Persisting,
    Done,
}

/// Human-readable stage label for an iteration's change-log entry
pub fn stage_label(iteration: u32) -> &'static str {
    match iteration {
        1 => "Foundation - Real-time data, fact-checking, grammar fixes",
        2 => "Enhancement - Creative injection, depth, consistency",
        _ => "Optimization - Originality check, citations, final polish",
    }
}

/// One change-log entry; ephemeral, returned to the caller and discarded
#[derive(Debug, Clone, Serialize)]
pub struct IterationLog {
    /// 1-based iteration number
    pub iteration: u32,
    pub stage_label: String,
    /// The primary provider's self-reported changes_summary
    pub summary: String,
    /// Trends provider contribution, or `{"error": ...}` on failure,
    /// or `null` when the stage did not consult it
    pub trends: serde_json::Value,
    /// Research provider contribution, same conventions as `trends`
    pub research: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct RefineOutcome {
    pub change_log: Vec<IterationLog>,
    pub final_document: ContentDocument,
}

/// Refinement failure modes
#[derive(Debug, Error)]
pub enum RefineError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Content not found: {0}")]
    NotFound(String),

    /// The primary provider is the sole source of generated content;
    /// its failure fails the run
    #[error("Primary provider failed: {0}")]
    Primary(ProviderError),

    /// Primary reply contained no parseable JSON object
    #[error("Failed to parse primary provider response: {0}")]
    ParseFailure(String),

    #[error("Run cancelled")]
    Cancelled,

    #[error(transparent)]
    Store(cforge_common::Error),
}

impl From<RefineError> for ApiError {
    fn from(err: RefineError) -> Self {
        match err {
            RefineError::InvalidParameters(msg) => ApiError::BadRequest(msg),
            RefineError::NotFound(msg) => ApiError::NotFound(msg),
            RefineError::Primary(e) => ApiError::Upstream(e.to_string()),
            RefineError::ParseFailure(msg) => ApiError::Upstream(msg),
            RefineError::Cancelled => ApiError::Conflict("Refinement run cancelled".into()),
            RefineError::Store(e) => ApiError::Common(e),
        }
    }
}
