//! Application configuration
//!
//! Every setting comes from a `DIRECTOR_`-prefixed environment variable (a `.env`
//! file is loaded first) and falls back to a default, so the director starts
//! with no configuration at all.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Application configuration loaded from environment
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP and WebSocket port
    pub server_port: u16,
    /// SQLite database for published content and snapshots
    pub database_url: String,

    /// Guardrail JSON document, hot reloaded
    pub guardrails_path: String,
    /// Directory holding `characters.json`, `items.json` and `locations.json`
    pub static_dir: String,
    /// Passphrase the secret encryption key is derived from
    pub secret_key: String,

    /// OpenAI-compatible endpoint used when no routing profile names one
    pub backend_base_url: Option<String>,
    pub backend_model: String,
    pub backend_api_key: Option<String>,
    pub backend_timeout_secs: u64,

    pub tick_interval_secs: u64,
    pub sweep_interval_secs: u64,
    pub decay_interval_secs: u64,
    pub config_poll_interval_secs: u64,
    /// Fixed seed for the automation loop and director; random when unset
    pub automation_seed: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_port: 3000,
            database_url: "sqlite://director.db?mode=rwc".to_string(),
            guardrails_path: "config/guardrails.json".to_string(),
            static_dir: "data/static".to_string(),
            secret_key: "change-me".to_string(),
            backend_base_url: None,
            backend_model: "gpt-4o-mini".to_string(),
            backend_api_key: None,
            backend_timeout_secs: 60,
            tick_interval_secs: 30,
            sweep_interval_secs: 5,
            decay_interval_secs: 60,
            config_poll_interval_secs: 2,
            automation_seed: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from `DIRECTOR_*` environment variables
    pub fn from_env() -> Result<Self> {
        let source = config::Config::builder()
            .add_source(config::Environment::with_prefix("DIRECTOR").try_parsing(true))
            .build()
            .context("Failed to read DIRECTOR_* environment")?;
        Self::from_config(source)
    }

    pub fn from_config(source: config::Config) -> Result<Self> {
        let config: Self = source
            .try_deserialize()
            .context("Invalid director configuration")?;
        if config.secret_key == Self::default().secret_key {
            tracing::warn!("DIRECTOR_SECRET_KEY is not set, secrets are encrypted with the default key");
        }
        Ok(config)
    }

    /// Whether a backend endpoint is configured at all
    pub fn has_backend(&self) -> bool {
        self.backend_base_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_settings() {
        let source = config::Config::builder()
            .set_override("server_port", 4100)
            .unwrap()
            .set_override("backend_base_url", "http://localhost:8080/v1")
            .unwrap()
            .build()
            .unwrap();

        let config = AppConfig::from_config(source).unwrap();
        assert_eq!(config.server_port, 4100);
        assert!(config.has_backend());
        assert_eq!(config.database_url, "sqlite://director.db?mode=rwc");
        assert_eq!(config.tick_interval_secs, 30);
        assert!(config.automation_seed.is_none());
    }

    #[test]
    fn test_empty_source_is_all_defaults() {
        let source = config::Config::builder().build().unwrap();
        let config = AppConfig::from_config(source).unwrap();
        assert_eq!(config.server_port, 3000);
        assert!(!config.has_backend());
    }
}
