//! Common error types for CourseForge

use thiserror::Error;

/// Common result type for CourseForge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across CourseForge services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Document changed since it was fetched (optimistic concurrency)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Deletion attempted on a protected document
    #[error("Protected: {0}")]
    Protected(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
