//! Database access for cforge-cs
//!
//! SQLite content store. Books and courses live in one table per kind
//! with their chapter/module arrays as JSON text columns; `version` is
//! the optimistic concurrency token checked by conditional updates.

pub mod books;
pub mod courses;
pub mod settings;
pub mod users;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;
use uuid::Uuid;

use cforge_common::models::{ContentDocument, ContentKind};

/// Initialize database connection pool
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create cforge-cs tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            email TEXT PRIMARY KEY,
            role TEXT NOT NULL DEFAULT 'user',
            api_token TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS books (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            subtitle TEXT,
            topic TEXT NOT NULL,
            level TEXT NOT NULL,
            chapters TEXT NOT NULL DEFAULT '[]',
            adult_content INTEGER NOT NULL DEFAULT 0,
            protected INTEGER NOT NULL DEFAULT 0,
            version INTEGER NOT NULL DEFAULT 0,
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS courses (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            topic TEXT NOT NULL,
            level TEXT NOT NULL,
            tier TEXT,
            content_structure TEXT NOT NULL DEFAULT '[]',
            adult_content INTEGER NOT NULL DEFAULT 0,
            protected INTEGER NOT NULL DEFAULT 0,
            version INTEGER NOT NULL DEFAULT 0,
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (settings, users, books, courses)");

    Ok(())
}

// ============================================================================
// Kind dispatch
// ============================================================================

/// Fetch either content kind by id
pub async fn get_document(
    pool: &SqlitePool,
    kind: ContentKind,
    id: Uuid,
) -> cforge_common::Result<Option<ContentDocument>> {
    match kind {
        ContentKind::Book => Ok(books::get_book(pool, id)
            .await?
            .map(ContentDocument::Book)),
        ContentKind::Course => Ok(courses::get_course(pool, id)
            .await?
            .map(ContentDocument::Course)),
    }
}

/// Conditionally write back a document's mutable fields
///
/// Fails with `Error::Conflict` when the stored version is no longer
/// `expected_version` (the document changed since it was fetched).
pub async fn update_document_checked(
    pool: &SqlitePool,
    doc: &ContentDocument,
    expected_version: i64,
) -> cforge_common::Result<()> {
    match doc {
        ContentDocument::Book(book) => {
            books::update_book_checked(pool, book, expected_version).await
        }
        ContentDocument::Course(course) => {
            courses::update_course_checked(pool, course, expected_version).await
        }
    }
}

/// Delete either content kind by id (rejected when protected)
pub async fn delete_document(
    pool: &SqlitePool,
    kind: ContentKind,
    id: Uuid,
) -> cforge_common::Result<()> {
    match kind {
        ContentKind::Book => books::delete_book(pool, id).await,
        ContentKind::Course => courses::delete_course(pool, id).await,
    }
}
