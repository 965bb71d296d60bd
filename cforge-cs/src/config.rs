//! Configuration resolution for cforge-cs
//!
//! Provider API keys resolve through three tiers with Database → ENV →
//! TOML priority. The database tier is authoritative so keys entered
//! through the admin surface win over deployment configuration.

use std::sync::Arc;
use std::time::Duration;

use sqlx::{Pool, Sqlite};
use tracing::{info, warn};

use cforge_common::config::TomlConfig;
use cforge_common::{Error, Result};

use crate::db;
use crate::providers::anthropic::AnthropicClient;
use crate::providers::perplexity::PerplexityClient;
use crate::providers::xai::XaiClient;
use crate::providers::{ProviderSet, DEFAULT_TIMEOUT};

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve one provider key from its three tiers.
///
/// `db_key` comes from the settings table, `env_var` names the process
/// environment variable, `toml_key` is the deployment config field.
fn resolve_from_tiers(
    provider: &str,
    db_key: Option<String>,
    env_var: &str,
    toml_key: Option<&String>,
    hint: &str,
) -> Result<String> {
    let env_key = std::env::var(env_var).ok();

    let mut sources = Vec::new();
    if db_key.as_deref().is_some_and(is_valid_key) {
        sources.push("database");
    }
    if env_key.as_deref().is_some_and(is_valid_key) {
        sources.push("environment");
    }
    if toml_key.is_some_and(|k| is_valid_key(k)) {
        sources.push("TOML");
    }

    if sources.len() > 1 {
        warn!(
            "{} API key found in multiple sources: {}. Using database (highest priority).",
            provider,
            sources.join(", ")
        );
    }

    if let Some(key) = db_key.filter(|k| is_valid_key(k)) {
        info!("{} API key loaded from database", provider);
        return Ok(key);
    }
    if let Some(key) = env_key.filter(|k| is_valid_key(k)) {
        info!("{} API key loaded from environment variable", provider);
        return Ok(key);
    }
    if let Some(key) = toml_key.filter(|k| is_valid_key(k)) {
        info!("{} API key loaded from TOML config", provider);
        return Ok(key.clone());
    }

    Err(Error::Config(format!(
        "{} API key not configured. Please configure using one of:\n\
         1. Admin API: POST /api/admin/settings\n\
         2. Environment: {}=your-key-here\n\
         3. TOML config: ~/.config/cforge/cforge-cs.toml ({})",
        provider, env_var, hint
    )))
}

/// Resolve the Claude (primary content) API key
pub async fn resolve_claude_api_key(
    db: &Pool<Sqlite>,
    toml_config: &TomlConfig,
) -> Result<String> {
    let db_key = db::settings::get_claude_api_key(db).await?;
    resolve_from_tiers(
        "Claude",
        db_key,
        "CLAUDE_API_KEY",
        toml_config.claude_api_key.as_ref(),
        "claude_api_key = \"your-key\"",
    )
}

/// Resolve the Grok (trends) API key
pub async fn resolve_grok_api_key(db: &Pool<Sqlite>, toml_config: &TomlConfig) -> Result<String> {
    let db_key = db::settings::get_grok_api_key(db).await?;
    resolve_from_tiers(
        "Grok",
        db_key,
        "GROK_API_KEY",
        toml_config.grok_api_key.as_ref(),
        "grok_api_key = \"your-key\"",
    )
}

/// Resolve the Perplexity (research) API key
pub async fn resolve_perplexity_api_key(
    db: &Pool<Sqlite>,
    toml_config: &TomlConfig,
) -> Result<String> {
    let db_key = db::settings::get_perplexity_api_key(db).await?;
    resolve_from_tiers(
        "Perplexity",
        db_key,
        "PERPLEXITY_API_KEY",
        toml_config.perplexity_api_key.as_ref(),
        "perplexity_api_key = \"your-key\"",
    )
}

/// Per-call provider timeout from config, falling back to the default
pub fn provider_timeout(toml_config: &TomlConfig) -> Duration {
    toml_config
        .provider_timeout_secs
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TIMEOUT)
}

/// Build the full provider set from resolved keys.
///
/// A missing auxiliary key is not fatal at startup: the client is
/// constructed with an empty key and fails per-call with a clear
/// error, which the orchestrator tolerates. The primary key missing is
/// fatal since nothing useful can run without it.
pub async fn build_provider_set(
    db: &Pool<Sqlite>,
    toml_config: &TomlConfig,
) -> Result<ProviderSet> {
    let timeout = provider_timeout(toml_config);

    let claude_key = resolve_claude_api_key(db, toml_config).await?;

    let grok_key = match resolve_grok_api_key(db, toml_config).await {
        Ok(key) => key,
        Err(e) => {
            warn!("Trends provider unavailable: {}", e);
            String::new()
        }
    };
    let perplexity_key = match resolve_perplexity_api_key(db, toml_config).await {
        Ok(key) => key,
        Err(e) => {
            warn!("Research provider unavailable: {}", e);
            String::new()
        }
    };

    Ok(ProviderSet {
        primary: Arc::new(AnthropicClient::new(claude_key, timeout)),
        trends: Arc::new(XaiClient::new(grok_key, timeout)),
        research: Arc::new(PerplexityClient::new(perplexity_key, timeout)),
    })
}

// ============================================================================
// Tests
// ============================================================================
