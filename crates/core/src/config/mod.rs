//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (HARVEST_*)
//! 2. TOML config file (if HARVEST_CONFIG_FILE set)
//! 3. Built-in defaults

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (HARVEST_*)
/// 2. TOML config file (if HARVEST_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Maximum number of cached result sets before LRU eviction.
    ///
    /// Set via HARVEST_MAX_ENTRIES environment variable.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Page size used when a query carries no pagination.
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Hard ceiling on any requested page size.
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// Whether fetched entries get a background refresh scheduled.
    ///
    /// Set via HARVEST_BACKGROUND_REFRESH environment variable.
    #[serde(default = "default_true")]
    pub background_refresh: bool,

    /// Attempts a refresh job gets before it is dropped.
    #[serde(default = "default_max_refresh_attempts")]
    pub max_refresh_attempts: u32,

    /// Base delay between refresh retries, multiplied by the attempt count.
    #[serde(default = "default_refresh_backoff_ms")]
    pub refresh_backoff_ms: u64,

    /// How often the refresh worker polls for due jobs.
    #[serde(default = "default_refresh_poll_interval_ms")]
    pub refresh_poll_interval_ms: u64,

    /// Deadline for a single fetch, and for waiting on a sibling fetch of the same key.
    ///
    /// Set via HARVEST_FETCH_TIMEOUT_MS environment variable.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Base URL of the extraction service used by the HTTP fetcher.
    ///
    /// Set via HARVEST_EXTRACTOR_URL environment variable.
    /// Required only when the HTTP fetcher is constructed.
    #[serde(default)]
    pub extractor_url: Option<String>,

    /// User-Agent string for calls to the extraction service.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_max_entries() -> usize {
    1000
}

fn default_limit() -> usize {
    20
}

fn default_max_limit() -> usize {
    100
}

fn default_true() -> bool {
    true
}

fn default_max_refresh_attempts() -> u32 {
    3
}

fn default_refresh_backoff_ms() -> u64 {
    30_000
}

fn default_refresh_poll_interval_ms() -> u64 {
    5_000
}

fn default_fetch_timeout_ms() -> u64 {
    20_000
}

fn default_user_agent() -> String {
    "harvest/0.1".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            background_refresh: true,
            max_refresh_attempts: default_max_refresh_attempts(),
            refresh_backoff_ms: default_refresh_backoff_ms(),
            refresh_poll_interval_ms: default_refresh_poll_interval_ms(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            extractor_url: None,
            user_agent: default_user_agent(),
        }
    }
}

impl AppConfig {
    /// Fetch deadline as Duration for use with tokio.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn refresh_backoff(&self) -> Duration {
        Duration::from_millis(self.refresh_backoff_ms)
    }

    pub fn refresh_poll_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_poll_interval_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `HARVEST_`
    /// 2. TOML file from `HARVEST_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("HARVEST_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("HARVEST_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Check if the extraction service URL is available (for deferred validation).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the extractor URL is not set.
    pub fn require_extractor_url(&self) -> Result<&str, ConfigError> {
        self.extractor_url.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "extractor_url".into(),
            hint: "Set HARVEST_EXTRACTOR_URL environment variable".into(),
        })
    }
}
