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
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - ledger caps are zero or the initial balance exceeds the cap
    /// - the API partition cap is zero or the API prefix is malformed
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        let ledger = &self.ledger;
        if ledger.max_tokens == 0 {
            return Err(invalid("ledger.max_tokens", "must be greater than 0"));
        }
        if ledger.unlocked_max_tokens < ledger.max_tokens {
            return Err(invalid("ledger.unlocked_max_tokens", "must not be below max_tokens"));
        }
        if ledger.initial_tokens > ledger.max_tokens {
            return Err(invalid("ledger.initial_tokens", "must not exceed max_tokens"));
        }
        if ledger.query_cache_max == 0 {
            return Err(invalid("ledger.query_cache_max", "must be greater than 0"));
        }
        if ledger.unlock_code.as_deref().is_some_and(|code| code.trim().is_empty()) {
            return Err(invalid("ledger.unlock_code", "must not be blank when set"));
        }

        let worker = &self.worker;
        if worker.version.is_empty() {
            return Err(invalid("worker.version", "must not be empty"));
        }
        if worker.api_max_entries == 0 {
            return Err(invalid("worker.api_max_entries", "must be greater than 0"));
        }
        if !worker.api_prefix.starts_with('/') || !worker.api_prefix.ends_with('/') {
            return Err(invalid("worker.api_prefix", "must start and end with '/'"));
        }

        if !worker.static_assets.contains(&worker.offline_page) {
            tracing::warn!(
                offline_page = %worker.offline_page,
                "offline page is not part of the static manifest; navigations will fall back to 503"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LedgerConfig, WorkerConfig};

    fn field_of(result: Result<(), ConfigError>) -> Option<String> {
        match result {
            Err(ConfigError::Invalid { field, .. }) => Some(field),
            _ => None,
        }
    }

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_bytes_zero() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("max_bytes"));
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("timeout_ms"));

        let config = AppConfig { timeout_ms: 301_000, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("timeout_ms"));
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("user_agent"));
    }

    #[test]
    fn test_validate_initial_tokens_above_cap() {
        let ledger = LedgerConfig { max_tokens: 10, initial_tokens: 11, ..Default::default() };
        let config = AppConfig { ledger, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("ledger.initial_tokens"));
    }

    #[test]
    fn test_validate_query_cache_zero() {
        let ledger = LedgerConfig { query_cache_max: 0, ..Default::default() };
        let config = AppConfig { ledger, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("ledger.query_cache_max"));
    }

    #[test]
    fn test_validate_blank_unlock_code() {
        let ledger = LedgerConfig { unlock_code: Some("  ".into()), ..Default::default() };
        let config = AppConfig { ledger, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("ledger.unlock_code"));
    }

    #[test]
    fn test_validate_api_prefix_shape() {
        let worker = WorkerConfig { api_prefix: "api".into(), ..Default::default() };
        let config = AppConfig { worker, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("worker.api_prefix"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let ledger = LedgerConfig { max_tokens: 1, initial_tokens: 1, query_cache_max: 1, ..Default::default() };
        let config = AppConfig { max_bytes: 1, timeout_ms: 100, ledger, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
