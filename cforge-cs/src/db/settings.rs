//! Settings database operations
//!
//! Key-value settings table; the authoritative tier for provider API
//! keys (see `crate::config` for the Database → ENV → TOML resolution).

use sqlx::SqlitePool;
use cforge_common::Result;

/// Get Anthropic API key from database
pub async fn get_claude_api_key(pool: &SqlitePool) -> Result<Option<String>> {
    get_setting(pool, "claude_api_key").await
}

/// Set Anthropic API key in database
pub async fn set_claude_api_key(pool: &SqlitePool, key: String) -> Result<()> {
    set_setting(pool, "claude_api_key", &key).await
}

/// Get xAI API key from database
pub async fn get_grok_api_key(pool: &SqlitePool) -> Result<Option<String>> {
    get_setting(pool, "grok_api_key").await
}

/// Set xAI API key in database
pub async fn set_grok_api_key(pool: &SqlitePool, key: String) -> Result<()> {
    set_setting(pool, "grok_api_key", &key).await
}

/// Get Perplexity API key from database
pub async fn get_perplexity_api_key(pool: &SqlitePool) -> Result<Option<String>> {
    get_setting(pool, "perplexity_api_key").await
}

/// Set Perplexity API key in database
pub async fn set_perplexity_api_key(pool: &SqlitePool, key: String) -> Result<()> {
    set_setting(pool, "perplexity_api_key", &key).await
}

/// Get a setting value by key
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(value)
}

/// Upsert a setting value
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value) VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}
