//! User table operations
//!
//! Minimal identity store: one row per user with an opaque API token.
//! Only the "admin" role is interpreted; it gates the cleanup, audit,
//! and settings routes.

use sqlx::{Row, SqlitePool};
use cforge_common::Result;

/// Authenticated caller identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub email: String,
    pub role: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// Resolve a bearer token to a user, if any
pub async fn find_by_token(pool: &SqlitePool, token: &str) -> Result<Option<User>> {
    let row = sqlx::query("SELECT email, role FROM users WHERE api_token = ?")
        .bind(token)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| User {
        email: r.get("email"),
        role: r.get("role"),
    }))
}

/// Upsert a user row (bootstrap and tests)
pub async fn upsert_user(pool: &SqlitePool, email: &str, role: &str, token: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO users (email, role, api_token) VALUES (?, ?, ?)
        ON CONFLICT(email) DO UPDATE SET role = excluded.role, api_token = excluded.api_token
        "#,
    )
    .bind(email)
    .bind(role)
    .bind(token)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::db::init_tables(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_unknown_token_is_none() {
        let pool = test_pool().await;
        assert!(find_by_token(&pool, "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_token_roundtrip_and_role() {
        let pool = test_pool().await;
        upsert_user(&pool, "admin@example.com", "admin", "tok-admin")
            .await
            .unwrap();

        let user = find_by_token(&pool, "tok-admin").await.unwrap().unwrap();
        assert_eq!(user.email, "admin@example.com");
        assert!(user.is_admin());

        upsert_user(&pool, "admin@example.com", "user", "tok-admin")
            .await
            .unwrap();
        let user = find_by_token(&pool, "tok-admin").await.unwrap().unwrap();
        assert!(!user.is_admin());
    }
}
