//! Book table operations

use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use cforge_common::models::Book;
use cforge_common::{Error, Result};

/// Insert a new book row
pub async fn create_book(pool: &SqlitePool, book: &Book) -> Result<()> {
    let chapters = serde_json::to_string(&book.chapters)
        .map_err(|e| Error::Internal(format!("Failed to serialize chapters: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO books (
            id, title, subtitle, topic, level, chapters,
            adult_content, protected, version, created_by, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(book.id.to_string())
    .bind(&book.title)
    .bind(&book.subtitle)
    .bind(&book.topic)
    .bind(&book.level)
    .bind(&chapters)
    .bind(book.adult_content as i64)
    .bind(book.protected as i64)
    .bind(book.version)
    .bind(&book.created_by)
    .bind(book.created_at.to_rfc3339())
    .bind(book.updated_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a book by id
pub async fn get_book(pool: &SqlitePool, id: Uuid) -> Result<Option<Book>> {
    let row = sqlx::query(
        r#"
        SELECT id, title, subtitle, topic, level, chapters,
               adult_content, protected, version, created_by, created_at, updated_at
        FROM books WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(book_from_row).transpose()
}

/// Load all books
pub async fn list_books(pool: &SqlitePool) -> Result<Vec<Book>> {
    let rows = sqlx::query(
        r#"
        SELECT id, title, subtitle, topic, level, chapters,
               adult_content, protected, version, created_by, created_at, updated_at
        FROM books ORDER BY created_at
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(book_from_row).collect()
}

/// Conditionally update a book's mutable fields
///
/// Writes title, subtitle, and chapters; `id`, `level`, and `topic` are
/// never rewritten. The WHERE clause carries the version check: zero
/// rows affected means either the book vanished (`NotFound`) or its
/// version moved (`Conflict`).
pub async fn update_book_checked(
    pool: &SqlitePool,
    book: &Book,
    expected_version: i64,
) -> Result<()> {
    let chapters = serde_json::to_string(&book.chapters)
        .map_err(|e| Error::Internal(format!("Failed to serialize chapters: {}", e)))?;

    let result = sqlx::query(
        r#"
        UPDATE books
        SET title = ?, subtitle = ?, chapters = ?,
            version = version + 1, updated_at = ?
        WHERE id = ? AND version = ?
        "#,
    )
    .bind(&book.title)
    .bind(&book.subtitle)
    .bind(&chapters)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(book.id.to_string())
    .bind(expected_version)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        let current: Option<i64> = sqlx::query_scalar("SELECT version FROM books WHERE id = ?")
            .bind(book.id.to_string())
            .fetch_optional(pool)
            .await?;
        return match current {
            None => Err(Error::NotFound(format!("Book not found: {}", book.id))),
            Some(found) => Err(Error::Conflict(format!(
                "Book {} changed since fetch (expected version {}, found {})",
                book.id, expected_version, found
            ))),
        };
    }

    Ok(())
}

/// Delete a book (rejected when protected, regardless of caller role)
pub async fn delete_book(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let protected: Option<i64> = sqlx::query_scalar("SELECT protected FROM books WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    match protected {
        None => Err(Error::NotFound(format!("Book not found: {}", id))),
        Some(p) if p != 0 => Err(Error::Protected(format!(
            "Book {} is protected and cannot be deleted",
            id
        ))),
        Some(_) => {
            sqlx::query("DELETE FROM books WHERE id = ?")
                .bind(id.to_string())
                .execute(pool)
                .await?;
            Ok(())
        }
    }
}

fn book_from_row(row: sqlx::sqlite::SqliteRow) -> Result<Book> {
    let id: String = row.get("id");
    let chapters: String = row.get("chapters");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Book {
        id: Uuid::parse_str(&id)
            .map_err(|e| Error::Internal(format!("Invalid book id {}: {}", id, e)))?,
        title: row.get("title"),
        subtitle: row.get("subtitle"),
        topic: row.get("topic"),
        level: row.get("level"),
        chapters: serde_json::from_str(&chapters)
            .map_err(|e| Error::Internal(format!("Failed to parse chapters: {}", e)))?,
        adult_content: row.get::<i64, _>("adult_content") != 0,
        protected: row.get::<i64, _>("protected") != 0,
        version: row.get("version"),
        created_by: row.get("created_by"),
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| Error::Internal(format!("Invalid created_at: {}", e)))?
            .with_timezone(&chrono::Utc),
        updated_at: chrono::DateTime::parse_from_rfc3339(&updated_at)
            .map_err(|e| Error::Internal(format!("Invalid updated_at: {}", e)))?
            .with_timezone(&chrono::Utc),
    })
}

// ============================================================================
// Tests
// ============================================================================
