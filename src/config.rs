//! Runtime configuration.
//!
//! Everything is read from `DUPGATE_*` environment variables once at startup
//! and carried in an explicit [`Config`] passed into every component, with no
//! hidden globals. All variables are optional; a malformed value logs a
//! warning and falls back to the default rather than aborting, since the
//! tool usually runs unattended inside a CI job.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Process-wide configuration, immutable for the run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Attempts per remote operation (`DUPGATE_MAX_RETRIES`)
    pub max_retries: u32,
    /// First backoff delay; doubles per retry (`DUPGATE_RETRY_BASE_DELAY_MS`)
    pub retry_base_delay: Duration,
    /// Backoff cap (`DUPGATE_RETRY_MAX_DELAY_MS`)
    pub retry_max_delay: Duration,
    /// Directory for cached search results and the metrics log
    /// (`DUPGATE_CACHE_DIR`)
    pub cache_dir: PathBuf,
    /// Max age of a servable cache entry (`DUPGATE_CACHE_TTL`, seconds)
    pub cache_ttl: Duration,
    /// Keyword-strategy bound (`DUPGATE_KEYWORD_LIMIT`)
    pub keyword_limit: usize,
    /// Purge a repository's cache entries after every issue write
    /// (`DUPGATE_CACHE_INVALIDATION`)
    pub cache_invalidation: bool,
    /// Metrics log retention window (`DUPGATE_METRICS_RETENTION_DAYS`)
    pub metrics_retention_days: u64,
    /// Reserved for future similarity strategies
    /// (`DUPGATE_SIMILARITY_THRESHOLD`); parsed and carried but unused.
    pub similarity_threshold: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_delay: Duration::from_millis(1000),
            retry_max_delay: Duration::from_secs(60),
            cache_dir: default_cache_dir(),
            cache_ttl: Duration::from_secs(3600),
            keyword_limit: 5,
            cache_invalidation: true,
            metrics_retention_days: 90,
            similarity_threshold: 0.8,
        }
    }
}

impl Config {
    /// Build the effective configuration from the environment.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_retries: env_parse("DUPGATE_MAX_RETRIES").unwrap_or(defaults.max_retries),
            retry_base_delay: env_parse("DUPGATE_RETRY_BASE_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_base_delay),
            retry_max_delay: env_parse("DUPGATE_RETRY_MAX_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_max_delay),
            cache_dir: std::env::var_os("DUPGATE_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            cache_ttl: env_parse("DUPGATE_CACHE_TTL")
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            keyword_limit: env_parse("DUPGATE_KEYWORD_LIMIT").unwrap_or(defaults.keyword_limit),
            cache_invalidation: env_bool("DUPGATE_CACHE_INVALIDATION")
                .unwrap_or(defaults.cache_invalidation),
            metrics_retention_days: env_parse("DUPGATE_METRICS_RETENTION_DAYS")
                .unwrap_or(defaults.metrics_retention_days),
            similarity_threshold: env_parse("DUPGATE_SIMILARITY_THRESHOLD")
                .unwrap_or(defaults.similarity_threshold),
        }
    }

    /// The append-only metrics log lives next to the cache entries but is
    /// exempt from cache cleanup.
    pub fn metrics_path(&self) -> PathBuf {
        self.cache_dir.join("metrics.csv")
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join("dupgate"))
        .unwrap_or_else(|| PathBuf::from(".dupgate"))
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring unparseable {}={:?}, using default", name, raw);
            None
        }
    }
}

fn env_bool(name: &str) -> Option<bool> {
    let raw = std::env::var(name).ok()?;
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!("Ignoring unparseable {}={:?}, using default", name, raw);
            None
        }
    }
}
