//! Configuration loading for CourseForge services
//!
//! Settings resolve through three tiers, highest priority first:
//! 1. Database `settings` table (authoritative, editable at runtime)
//! 2. Environment variables (`CLAUDE_API_KEY`, `GROK_API_KEY`, ...)
//! 3. TOML config file (`~/.config/cforge/cforge-cs.toml`)
//!
//! Tier resolution itself lives in the service crates (they own the
//! database); this module provides the TOML layer and path handling.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// TOML configuration file contents
///
/// All fields are optional; missing fields fall through to the next
/// resolution tier or to compiled defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// HTTP listen port
    pub port: Option<u16>,
    /// SQLite database file path
    pub database: Option<PathBuf>,
    /// Anthropic (primary/general) API key
    pub claude_api_key: Option<String>,
    /// xAI (trends) API key
    pub grok_api_key: Option<String>,
    /// Perplexity (research) API key
    pub perplexity_api_key: Option<String>,
    /// Per-call provider timeout in seconds (default 60)
    pub provider_timeout_secs: Option<u64>,
}

/// Default configuration file path for the platform
///
/// Linux: `~/.config/cforge/<service>.toml`, falling back to
/// `/etc/cforge/<service>.toml`; other platforms use the OS config dir.
pub fn default_config_path(service: &str) -> PathBuf {
    let file_name = format!("{}.toml", service);
    if let Some(dir) = dirs::config_dir() {
        let user_config = dir.join("cforge").join(&file_name);
        if user_config.exists() || !cfg!(target_os = "linux") {
            return user_config;
        }
        let system_config = PathBuf::from("/etc/cforge").join(&file_name);
        if system_config.exists() {
            return system_config;
        }
        return user_config;
    }
    PathBuf::from("./cforge").join(file_name)
}

/// Load TOML configuration from a file
///
/// A missing file is not an error: returns defaults so the ENV tier can
/// take over.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No TOML config file, using defaults");
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Write TOML configuration to a file, creating parent directories
///
/// Writes to a temp file in the same directory and renames over the
/// target so readers never see a partial file.
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
