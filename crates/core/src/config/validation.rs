//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_entries`, `max_limit`, `max_refresh_attempts` or `refresh_poll_interval_ms` is 0
    /// - `default_limit` exceeds `max_limit`
    /// - `fetch_timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_entries == 0 {
            return Err(ConfigError::Invalid { field: "max_entries".into(), reason: "must be greater than 0".into() });
        }

        if self.max_limit == 0 {
            return Err(ConfigError::Invalid { field: "max_limit".into(), reason: "must be greater than 0".into() });
        }
        if self.default_limit > self.max_limit {
            return Err(ConfigError::Invalid {
                field: "default_limit".into(),
                reason: format!("must not exceed max_limit ({})", self.max_limit),
            });
        }

        if self.max_refresh_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "max_refresh_attempts".into(),
                reason: "must be at least 1".into(),
            });
        }

        if self.fetch_timeout_ms < 100 {
            return Err(ConfigError::Invalid {
                field: "fetch_timeout_ms".into(),
                reason: "must be at least 100ms".into(),
            });
        }
        if self.fetch_timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "fetch_timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.refresh_poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "refresh_poll_interval_ms".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if !self.background_refresh {
            tracing::debug!("background refresh disabled; no refresh jobs will be scheduled");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_entries_zero() {
        let config = AppConfig { max_entries: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_entries"));
    }

    #[test]
    fn test_validate_default_limit_above_max() {
        let config = AppConfig { default_limit: 200, max_limit: 100, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "default_limit"));
    }

    #[test]
    fn test_validate_zero_attempts() {
        let config = AppConfig { max_refresh_attempts: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_refresh_attempts"));
    }

    #[test]
    fn test_validate_zero_poll_interval() {
        let config = AppConfig { refresh_poll_interval_ms: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "refresh_poll_interval_ms"));
    }

    #[test]
    fn test_validate_timeout_too_small() {
        let config = AppConfig { fetch_timeout_ms: 50, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "fetch_timeout_ms"));
    }

    #[test]
    fn test_validate_timeout_exceeds_limit() {
        let config = AppConfig { fetch_timeout_ms: 301_000, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "fetch_timeout_ms"));
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config =
            AppConfig { max_entries: 1, default_limit: 1, max_limit: 1, fetch_timeout_ms: 100, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
