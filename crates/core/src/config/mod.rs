//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (HYPERNEWS_*, nested sections split on `__`)
//! 2. TOML config file (if HYPERNEWS_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
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
/// 1. Environment variables (HYPERNEWS_*)
/// 2. TOML config file (if HYPERNEWS_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the news site; relative request paths resolve against it.
    ///
    /// Set via HYPERNEWS_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to the SQLite partition store.
    ///
    /// Set via HYPERNEWS_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Directory holding the ledger's key-value records.
    ///
    /// Set via HYPERNEWS_STATE_DIR environment variable.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via HYPERNEWS_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via HYPERNEWS_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to read per response.
    ///
    /// Set via HYPERNEWS_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Subscribed callers bypass token costs entirely.
    ///
    /// Set via HYPERNEWS_SUBSCRIBED environment variable.
    #[serde(default)]
    pub subscribed: bool,

    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub worker: WorkerConfig,
}

/// Token ledger tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Balance cap while the ledger is in its normal mode.
    pub max_tokens: u64,
    /// Balance cap once the unlock reward has been granted.
    pub unlocked_max_tokens: u64,
    /// Balance of a freshly created ledger.
    pub initial_tokens: u64,
    /// Tokens granted once per calendar day.
    pub daily_refill: u64,
    /// Tokens granted for every query-cache hit.
    pub cache_hit_reward: u64,
    /// Maximum number of memoized answers.
    pub query_cache_max: usize,
    /// Lifetime of a memoized answer in seconds.
    pub query_cache_ttl_secs: u64,
    /// Code that redeems the one-time unlock; unlocking is off when unset.
    pub unlock_code: Option<String>,
    /// Tokens granted by the unlock.
    pub unlock_reward: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_tokens: 100,
            unlocked_max_tokens: 999_999,
            initial_tokens: 30,
            daily_refill: 30,
            cache_hit_reward: 2,
            query_cache_max: 300,
            query_cache_ttl_secs: 6 * 60 * 60,
            unlock_code: None,
            unlock_reward: 10_000,
        }
    }
}

impl LedgerConfig {
    /// Query-cache TTL as a chrono duration.
    pub fn query_cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.query_cache_ttl_secs as i64)
    }
}

/// Tiered HTTP cache tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Deployed shell version; doubles as the static partition name.
    pub version: String,
    /// Path prefix that marks backend API traffic.
    pub api_prefix: String,
    /// Entry cap of the API partition.
    pub api_max_entries: usize,
    /// `limit` parameter used when warming category listings.
    pub prefetch_limit: u32,
    /// Pre-cached page served to navigations while offline.
    pub offline_page: String,
    /// Application-shell manifest pre-cached on install.
    pub static_assets: Vec<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            version: "hypernews-v17".into(),
            api_prefix: "/api/".into(),
            api_max_entries: 500,
            prefetch_limit: 30,
            offline_page: "/offline.html".into(),
            static_assets: default_static_assets(),
        }
    }
}

fn default_static_assets() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/offline.html",
        "/settings.html",
        "/about.html",
        "/css/base.css?v=16",
        "/css/chat.css?v=16",
        "/css/settings.css?v=16",
        "/css/feed.css?v=17",
        "/js/storage.js?v=16",
        "/js/api.js?v=16",
        "/js/renderer.js?v=16",
        "/js/tts.js?v=16",
        "/js/chat.js?v=16",
        "/js/app.js?v=16",
        "/js/settings.js?v=16",
        "/js/feed.js?v=17",
        "/manifest.json",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./hypernews-cache.sqlite")
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("./hypernews-state")
}

fn default_user_agent() -> String {
    "hypernews-eco/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            db_path: default_db_path(),
            state_dir: default_state_dir(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            subscribed: false,
            ledger: LedgerConfig::default(),
            worker: WorkerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `HYPERNEWS_`
    /// 2. TOML file from `HYPERNEWS_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("HYPERNEWS_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("HYPERNEWS_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.origin, "http://localhost:8080");
        assert_eq!(config.db_path, PathBuf::from("./hypernews-cache.sqlite"));
        assert_eq!(config.user_agent, "hypernews-eco/0.1");
        assert_eq!(config.timeout_ms, 20_000);
        assert!(!config.subscribed);
        assert_eq!(config.ledger.max_tokens, 100);
        assert_eq!(config.ledger.query_cache_max, 300);
        assert_eq!(config.ledger.query_cache_ttl(), chrono::Duration::hours(6));
        assert_eq!(config.worker.api_max_entries, 500);
        assert!(config.worker.static_assets.contains(&"/offline.html".to_string()));
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_load_layers_file_and_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "hypernews.toml",
                r#"
                origin = "https://news.example"

                [ledger]
                max_tokens = 50
                initial_tokens = 10
                "#,
            )?;
            jail.set_env("HYPERNEWS_CONFIG_FILE", "hypernews.toml");
            jail.set_env("HYPERNEWS_LEDGER__DAILY_REFILL", "5");
            jail.set_env("HYPERNEWS_SUBSCRIBED", "true");

            let config = AppConfig::load().expect("config loads");
            assert_eq!(config.origin, "https://news.example");
            assert_eq!(config.ledger.max_tokens, 50);
            assert_eq!(config.ledger.initial_tokens, 10);
            assert_eq!(config.ledger.daily_refill, 5);
            assert_eq!(config.ledger.cache_hit_reward, 2);
            assert!(config.subscribed);
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("HYPERNEWS_WORKER__API_MAX_ENTRIES", "0");
            assert!(matches!(AppConfig::load(), Err(ConfigError::Invalid { .. })));
            Ok(())
        });
    }
}
