//! Course table operations

use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use cforge_common::models::Course;
use cforge_common::{Error, Result};

/// Insert a new course row
pub async fn create_course(pool: &SqlitePool, course: &Course) -> Result<()> {
    let modules = serde_json::to_string(&course.content_structure)
        .map_err(|e| Error::Internal(format!("Failed to serialize modules: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO courses (
            id, title, description, topic, level, tier, content_structure,
            adult_content, protected, version, created_by, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(course.id.to_string())
    .bind(&course.title)
    .bind(&course.description)
    .bind(&course.topic)
    .bind(&course.level)
    .bind(&course.tier)
    .bind(&modules)
    .bind(course.adult_content as i64)
    .bind(course.protected as i64)
    .bind(course.version)
    .bind(&course.created_by)
    .bind(course.created_at.to_rfc3339())
    .bind(course.updated_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a course by id
pub async fn get_course(pool: &SqlitePool, id: Uuid) -> Result<Option<Course>> {
    let row = sqlx::query(
        r#"
        SELECT id, title, description, topic, level, tier, content_structure,
               adult_content, protected, version, created_by, created_at, updated_at
        FROM courses WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(course_from_row).transpose()
}

/// Load all courses
pub async fn list_courses(pool: &SqlitePool) -> Result<Vec<Course>> {
    let rows = sqlx::query(
        r#"
        SELECT id, title, description, topic, level, tier, content_structure,
               adult_content, protected, version, created_by, created_at, updated_at
        FROM courses ORDER BY created_at
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(course_from_row).collect()
}

/// Conditionally update a course's mutable fields
///
/// Writes title, description, and content_structure; `id`, `level`, and
/// `topic` are never rewritten. See [`crate::db::books::update_book_checked`]
/// for the version-check semantics.
pub async fn update_course_checked(
    pool: &SqlitePool,
    course: &Course,
    expected_version: i64,
) -> Result<()> {
    let modules = serde_json::to_string(&course.content_structure)
        .map_err(|e| Error::Internal(format!("Failed to serialize modules: {}", e)))?;

    let result = sqlx::query(
        r#"
        UPDATE courses
        SET title = ?, description = ?, content_structure = ?,
            version = version + 1, updated_at = ?
        WHERE id = ? AND version = ?
        "#,
    )
    .bind(&course.title)
    .bind(&course.description)
    .bind(&modules)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(course.id.to_string())
    .bind(expected_version)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        let current: Option<i64> = sqlx::query_scalar("SELECT version FROM courses WHERE id = ?")
            .bind(course.id.to_string())
            .fetch_optional(pool)
            .await?;
        return match current {
            None => Err(Error::NotFound(format!("Course not found: {}", course.id))),
            Some(found) => Err(Error::Conflict(format!(
                "Course {} changed since fetch (expected version {}, found {})",
                course.id, expected_version, found
            ))),
        };
    }

    Ok(())
}

/// Delete a course (rejected when protected, regardless of caller role)
pub async fn delete_course(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let protected: Option<i64> = sqlx::query_scalar("SELECT protected FROM courses WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    match protected {
        None => Err(Error::NotFound(format!("Course not found: {}", id))),
        Some(p) if p != 0 => Err(Error::Protected(format!(
            "Course {} is protected and cannot be deleted",
            id
        ))),
        Some(_) => {
            sqlx::query("DELETE FROM courses WHERE id = ?")
                .bind(id.to_string())
                .execute(pool)
                .await?;
            Ok(())
        }
    }
}

fn course_from_row(row: sqlx::sqlite::SqliteRow) -> Result<Course> {
    let id: String = row.get("id");
    let modules: String = row.get("content_structure");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Course {
        id: Uuid::parse_str(&id)
            .map_err(|e| Error::Internal(format!("Invalid course id {}: {}", id, e)))?,
        title: row.get("title"),
        description: row.get("description"),
        topic: row.get("topic"),
        level: row.get("level"),
        tier: row.get("tier"),
        content_structure: serde_json::from_str(&modules)
            .map_err(|e| Error::Internal(format!("Failed to parse modules: {}", e)))?,
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
