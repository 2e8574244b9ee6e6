//! Centralized configuration for the kiosk search engine
//!
//! Configuration follows a simple hierarchy:
//! 1. Safe defaults (defined as constants)
//! 2. TOML file overrides
//! 3. Environment variable overrides (`KIOSK_SEARCH_*`)
//! 4. Runtime validation

pub mod error;
pub mod source;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use source::{ConfigurationLoader, ConfigurationSource, EnvironmentSource, TomlFileSource};
pub use validation::Validate;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

// =============================================================================
// SAFE DEFAULTS
// =============================================================================

// Query contract
const DEFAULT_MAX_TEXT_LENGTH: usize = 200;
const DEFAULT_LIMIT: usize = 50;
const DEFAULT_MAX_LIMIT: usize = 500;
const DEFAULT_DEBOUNCE_MS: u64 = 300; // Typing cadence on the on-screen keyboard

// Result cache
const DEFAULT_CACHE_TTL_SECS: u64 = 300; // 5 minutes
const DEFAULT_CACHE_CAPACITY: usize = 100;

// Retry policy
const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY_MS: u64 = 2_000;

// Strategy selector
const DEFAULT_TRANSIENT_FAILURE_THRESHOLD: u32 = 3;

// Content repository
const DEFAULT_DATABASE_FILE: &str = "content.db";
const DEFAULT_REPOSITORY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_MAX_CONNECTIONS: u32 = 4;
const DEFAULT_CANDIDATE_POOL: usize = 200;

// Telemetry
const DEFAULT_TRACING_LEVEL: &str = "info";
const DEFAULT_JSON_LOGS: bool = false;

/// Read an environment variable and parse it, falling back to `default`
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Core configuration for the search engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Query contract limits
    #[serde(default)]
    pub query: QueryConfig,

    /// Result cache sizing and lifetime
    #[serde(default)]
    pub cache: CacheConfig,

    /// Retry policy applied by the orchestrator
    #[serde(default)]
    pub retry: RetryConfig,

    /// Strategy selector thresholds
    #[serde(default)]
    pub selector: SelectorConfig,

    /// Local content repository
    #[serde(default)]
    pub repository: RepositoryConfig,

    /// Logging setup
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Limits on what a caller may submit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Maximum query text length in characters; longer input is rejected
    pub max_text_length: usize,

    /// Page size used when the caller does not pick one
    pub default_limit: usize,

    /// Largest page size a caller may request
    pub max_limit: usize,

    /// Quiet period the debouncer waits before dispatching a keystroke query
    pub debounce_ms: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_text_length: DEFAULT_MAX_TEXT_LENGTH,
            default_limit: DEFAULT_LIMIT,
            max_limit: DEFAULT_MAX_LIMIT,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl QueryConfig {
    /// Load configuration from environment variables with safe defaults
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply any `KIOSK_SEARCH_*` variables that are set on top of `self`
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        Self {
            max_text_length: env_or("KIOSK_SEARCH_MAX_TEXT_LENGTH", self.max_text_length),
            default_limit: env_or("KIOSK_SEARCH_DEFAULT_LIMIT", self.default_limit),
            max_limit: env_or("KIOSK_SEARCH_MAX_LIMIT", self.max_limit),
            debounce_ms: env_or("KIOSK_SEARCH_DEBOUNCE_MS", self.debounce_ms),
        }
    }

    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Validate for QueryConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_range(
            self.max_text_length as u64,
            1,
            10_000,
            "query.max_text_length",
        )?;
        validation::validate_range(self.max_limit as u64, 1, 10_000, "query.max_limit")?;
        validation::validate_range(
            self.default_limit as u64,
            1,
            self.max_limit as u64,
            "query.default_limit",
        )?;
        validation::validate_range(self.debounce_ms, 0, 5_000, "query.debounce_ms")
    }
}

/// Result cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds an entry stays fresh
    pub ttl_secs: u64,

    /// Maximum number of entries; the oldest entry is evicted beyond this
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl CacheConfig {
    /// Load configuration from environment variables with safe defaults
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply any `KIOSK_SEARCH_*` variables that are set on top of `self`
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        Self {
            ttl_secs: env_or("KIOSK_SEARCH_CACHE_TTL_SECS", self.ttl_secs),
            capacity: env_or("KIOSK_SEARCH_CACHE_CAPACITY", self.capacity),
        }
    }

    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Validate for CacheConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_range(self.ttl_secs, 1, 86_400, "cache.ttl_secs")?;
        validation::validate_range(self.capacity as u64, 1, 100_000, "cache.capacity")
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,

    /// Fixed pause between attempts
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
            delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

impl RetryConfig {
    /// Load configuration from environment variables with safe defaults
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply any `KIOSK_SEARCH_*` variables that are set on top of `self`
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        Self {
            max_attempts: env_or("KIOSK_SEARCH_RETRY_MAX_ATTEMPTS", self.max_attempts),
            delay_ms: env_or("KIOSK_SEARCH_RETRY_DELAY_MS", self.delay_ms),
        }
    }

    pub const fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Validate for RetryConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_range(u64::from(self.max_attempts), 1, 10, "retry.max_attempts")?;
        validation::validate_range(self.delay_ms, 0, 60_000, "retry.delay_ms")
    }
}

/// Strategy selector configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Consecutive transient primary failures after which a call is served by the fallback
    pub transient_failure_threshold: u32,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            transient_failure_threshold: DEFAULT_TRANSIENT_FAILURE_THRESHOLD,
        }
    }
}

impl SelectorConfig {
    /// Load configuration from environment variables with safe defaults
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply any `KIOSK_SEARCH_*` variables that are set on top of `self`
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        Self {
            transient_failure_threshold: env_or(
                "KIOSK_SEARCH_TRANSIENT_THRESHOLD",
                self.transient_failure_threshold,
            ),
        }
    }
}

impl Validate for SelectorConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_range(
            u64::from(self.transient_failure_threshold),
            1,
            100,
            "selector.transient_failure_threshold",
        )
    }
}

/// Local content repository configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// SQLite database file holding the content tables and their FTS5 indexes
    pub database_path: PathBuf,

    /// Upper bound on a single repository call; exceeding it is a transient failure
    pub timeout_ms: u64,

    /// Connection pool size
    pub max_connections: u32,

    /// Rows fetched per content type before relevance re-ranking
    pub candidate_pool: usize,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            timeout_ms: DEFAULT_REPOSITORY_TIMEOUT_MS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            candidate_pool: DEFAULT_CANDIDATE_POOL,
        }
    }
}

/// Platform data directory, falling back to the working directory
fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kiosksearch")
        .join(DEFAULT_DATABASE_FILE)
}

impl RepositoryConfig {
    /// Load configuration from environment variables with safe defaults
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply any `KIOSK_SEARCH_*` variables that are set on top of `self`
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        Self {
            database_path: env_or("KIOSK_SEARCH_DATABASE_PATH", self.database_path),
            timeout_ms: env_or("KIOSK_SEARCH_REPOSITORY_TIMEOUT_MS", self.timeout_ms),
            max_connections: env_or("KIOSK_SEARCH_DB_MAX_CONNECTIONS", self.max_connections),
            candidate_pool: env_or("KIOSK_SEARCH_CANDIDATE_POOL", self.candidate_pool),
        }
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Validate for RepositoryConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_non_empty(
            &self.database_path.to_string_lossy(),
            "repository.database_path",
        )?;
        validation::validate_range(self.timeout_ms, 10, 120_000, "repository.timeout_ms")?;
        validation::validate_range(
            u64::from(self.max_connections),
            1,
            64,
            "repository.max_connections",
        )?;
        validation::validate_range(
            self.candidate_pool as u64,
            1,
            100_000,
            "repository.candidate_pool",
        )
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Default tracing level when `RUST_LOG` is unset
    pub tracing_level: String,

    /// Emit logs as JSON lines
    pub json_logs: bool,

    /// Directory for rolling log files; stderr only when unset
    pub log_dir: Option<PathBuf>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            tracing_level: DEFAULT_TRACING_LEVEL.to_string(),
            json_logs: DEFAULT_JSON_LOGS,
            log_dir: None,
        }
    }
}

impl TelemetryConfig {
    /// Load configuration from environment variables with safe defaults
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply any `KIOSK_SEARCH_*` variables that are set on top of `self`
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        Self {
            tracing_level: env_or("KIOSK_SEARCH_LOG", self.tracing_level),
            json_logs: env_or("KIOSK_SEARCH_JSON_LOGS", self.json_logs),
            log_dir: std::env::var("KIOSK_SEARCH_LOG_DIR")
                .ok()
                .map(PathBuf::from)
                .or(self.log_dir),
        }
    }
}

impl Validate for TelemetryConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_tracing_level(&self.tracing_level)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            query: QueryConfig::default(),
            cache: CacheConfig::default(),
            retry: RetryConfig::default(),
            selector: SelectorConfig::default(),
            repository: RepositoryConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl SearchConfig {
    /// Load configuration from environment variables with safe defaults
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply any `KIOSK_SEARCH_*` variables that are set on top of `self`
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        Self {
            query: self.query.with_env_overrides(),
            cache: self.cache.with_env_overrides(),
            retry: self.retry.with_env_overrides(),
            selector: self.selector.with_env_overrides(),
            repository: self.repository.with_env_overrides(),
            telemetry: self.telemetry.with_env_overrides(),
        }
    }

    /// Render the effective configuration as TOML
    ///
    /// # Errors
    /// Returns `ConfigError::TomlSerialization` if a value cannot be represented
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Validate for SearchConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.query.validate()?;
        self.cache.validate()?;
        self.retry.validate()?;
        self.selector.validate()?;
        self.repository.validate()?;
        self.telemetry.validate()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_query_contract() {
        let config = SearchConfig::default();
        assert_eq!(config.query.max_text_length, 200);
        assert_eq!(config.cache.ttl(), Duration::from_secs(300));
        assert_eq!(config.cache.capacity, 100);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.delay(), Duration::from_secs(2));
        assert_eq!(config.selector.transient_failure_threshold, 3);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = SearchConfig::default();
        assert!(config.validate().is_ok(), "{:?}", config.validate());
    }

    #[test]
    fn test_validation_rejects_default_limit_above_max() {
        let mut config = SearchConfig::default();
        config.query.max_limit = 20;
        config.query.default_limit = 50;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("query.default_limit"));
    }

    #[test]
    fn test_validation_rejects_zero_cache_capacity() {
        let mut config = SearchConfig::default();
        config.cache.capacity = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_validation_rejects_unknown_tracing_level() {
        let mut config = SearchConfig::default();
        config.telemetry.tracing_level = "chatty".to_string();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Invalid tracing level"));
    }

    #[test]
    fn test_environment_variable_overrides() {
        unsafe {
            std::env::set_var("KIOSK_SEARCH_CANDIDATE_POOL", "321");
        }

        let config = SearchConfig::from_env();
        assert_eq!(config.repository.candidate_pool, 321);

        unsafe {
            std::env::remove_var("KIOSK_SEARCH_CANDIDATE_POOL");
        }
    }

    #[test]
    fn test_partial_toml_fills_in_defaults() {
        let config: SearchConfig = toml::from_str(
            r#"
            [cache]
            ttl_secs = 60
            capacity = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.query, QueryConfig::default());
        assert_eq!(config.retry, RetryConfig::default());
    }

    #[test]
    fn test_configuration_serialization_roundtrip() {
        let original = SearchConfig::default();
        let rendered = original.to_toml().unwrap();
        assert!(rendered.contains("[cache]"));

        let parsed: SearchConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, original);
    }
}
