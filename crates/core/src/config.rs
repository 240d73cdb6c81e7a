//! Application configuration.
//!
//! Settings come from an optional YAML file with serde defaults, then
//! environment variables override individual values. The environment names
//! match what deployment scripts already export (`DATABASE_URL`,
//! `DB_READONLY_URL`, `QUERY_TIMEOUT_SECONDS`, ...).

use std::fs;

use serde::Deserialize;
use sqlgate_error::{ErrorCode, GateError, Result};

use crate::cache::CacheConfig;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    /// Read-write connection string. Only used by provisioning tooling, never
    /// by the query pipeline.
    #[serde(default)]
    pub database_url: Option<String>,
    /// Read-only connection string the pipeline executes against.
    #[serde(default)]
    pub readonly_url: Option<String>,
    #[serde(default)]
    pub query: QuerySettings,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub translator: TranslatorSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QuerySettings {
    /// Per-statement timeout in seconds, enforced server-side.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Row cap applied when a statement carries no limit of its own.
    #[serde(default = "default_row_limit")]
    pub default_row_limit: i64,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            default_row_limit: default_row_limit(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TranslatorSettings {
    /// When set, skip the hosted model and use the deterministic offline
    /// pattern table. On by default so the pipeline works without credentials.
    #[serde(default = "default_use_stub")]
    pub use_stub: bool,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for TranslatorSettings {
    fn default() -> Self {
        Self {
            use_stub: default_use_stub(),
            api_key: None,
            model: default_model(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    5
}
fn default_row_limit() -> i64 {
    1000
}
fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}
fn default_use_stub() -> bool {
    true
}
fn default_model() -> String {
    "models/gemini-1.5-flash-002".to_string()
}

impl AppConfig {
    /// Load from a YAML file and then layer environment overrides on top.
    pub fn from_file(path: &str) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            GateError::new(
                ErrorCode::MissingConfig,
                format!("Failed to read config file {path}: {e}"),
            )
        })?;
        let mut config: AppConfig = serde_yaml::from_str(&raw).map_err(|e| {
            GateError::new(
                ErrorCode::InvalidConfig,
                format!("Failed to parse config file {path}: {e}"),
            )
        })?;
        config.apply_env()?;
        Ok(config)
    }

    /// Build purely from environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = AppConfig::default();
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database_url = Some(url);
        }
        if let Ok(url) = std::env::var("DB_READONLY_URL") {
            self.readonly_url = Some(url);
        }
        if let Some(v) = parse_env::<u64>("QUERY_TIMEOUT_SECONDS")? {
            self.query.timeout_secs = v;
        }
        if let Some(v) = parse_env::<i64>("ROW_LIMIT")? {
            self.query.default_row_limit = v;
        }
        if let Some(v) = parse_env::<i64>("QUERY_CACHE_TTL_SECONDS")? {
            self.cache.ttl_seconds = v;
        }
        if let Some(v) = parse_env::<i64>("QUERY_CACHE_MAX_ROWS")? {
            self.cache.max_entries = v;
        }
        if let Ok(v) = std::env::var("USE_GEMINI_STUB") {
            self.translator.use_stub = v != "0";
        }
        if let Ok(v) = std::env::var("GEMINI_API_KEY") {
            self.translator.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("GEMINI_MODEL") {
            self.translator.model = v;
        }
        Ok(())
    }

    /// The read-only connection string the executor requires.
    pub fn readonly_url(&self) -> Result<&str> {
        self.readonly_url.as_deref().ok_or_else(|| {
            GateError::new(ErrorCode::MissingConfig, "DB_READONLY_URL is not set")
        })
    }

    pub fn timeout_ms(&self) -> u64 {
        self.query.timeout_secs * 1000
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw.parse::<T>().map(Some).map_err(|_| {
            GateError::new(
                ErrorCode::InvalidConfig,
                format!("Could not parse {name}={raw}"),
            )
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.query.timeout_secs, 5);
        assert_eq!(config.query.default_row_limit, 1000);
        assert_eq!(config.cache.ttl_seconds, 30);
        assert_eq!(config.cache.max_entries, 128);
        assert_eq!(config.server.listen_addr, "0.0.0.0:8080");
        assert!(config.translator.use_stub);
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        // Parse directly so ambient environment variables cannot interfere.
        let config: AppConfig = serde_yaml::from_str(
            "readonly_url: postgres://readonly@localhost/northwind\nquery:\n  timeout_secs: 2\ncache:\n  ttl_seconds: 0",
        )
        .unwrap();
        assert_eq!(
            config.readonly_url().unwrap(),
            "postgres://readonly@localhost/northwind"
        );
        assert_eq!(config.query.timeout_secs, 2);
        assert_eq!(config.timeout_ms(), 2000);
        assert_eq!(config.cache.ttl_seconds, 0);
        assert_eq!(config.cache.max_entries, 128);
    }

    #[test]
    fn malformed_yaml_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "query: [not, a, map]").unwrap();
        let err = AppConfig::from_file(file.path().to_str().unwrap()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfig);
    }

    #[test]
    fn missing_readonly_url_is_a_config_error() {
        let config = AppConfig::default();
        let err = config.readonly_url().unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingConfig);
    }

    #[test]
    fn unreadable_file_is_a_config_error() {
        let err = AppConfig::from_file("/nonexistent/sqlgate.yaml").unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingConfig);
    }
}
