//! Configuration management for the marketminer crawler
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Crawler rate/retry policy
    pub crawler: CrawlerConfig,

    /// Egress proxy configuration
    pub proxy: ProxyConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Rate/retry policy governing the fetcher, plus crawl-level knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of concurrent in-flight requests
    pub max_concurrent_requests: usize,

    /// Minimum delay between requests in milliseconds (global, 0 disables)
    pub min_request_delay_ms: u64,

    /// HTTP status codes eligible for retry
    ///
    /// 5xx plus the 4xx codes the target site returns when rate-limiting or
    /// blocking an egress.
    pub retry_status_codes: Vec<u16>,

    /// Maximum retry attempts per request
    pub max_retries: u32,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Response cache time-to-live in seconds (0 disables caching)
    pub cache_ttl_secs: u64,

    /// Records buffered before the sink flushes to the store
    pub batch_size: usize,

    /// Base URL for brand search pages (overridable for tests)
    pub search_base_url: String,
}

/// Egress proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Proxy endpoints in `host:port:username:password` format
    pub endpoints: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path
    pub sqlite_path: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = env_parse::<usize>("MARKETMINER_MAX_CONCURRENT_REQUESTS") {
            config.crawler.max_concurrent_requests = v;
        }
        if let Some(v) = env_parse::<u64>("MARKETMINER_MIN_REQUEST_DELAY_MS") {
            config.crawler.min_request_delay_ms = v;
        }
        if let Some(v) = env_parse::<u32>("MARKETMINER_MAX_RETRIES") {
            config.crawler.max_retries = v;
        }
        if let Some(v) = env_parse::<u64>("MARKETMINER_REQUEST_TIMEOUT") {
            config.crawler.request_timeout_secs = v;
        }
        if let Some(v) = env_parse::<u64>("MARKETMINER_CACHE_TTL") {
            config.crawler.cache_ttl_secs = v;
        }
        if let Some(v) = env_parse::<usize>("MARKETMINER_BATCH_SIZE") {
            config.crawler.batch_size = v;
        }
        if let Ok(v) = std::env::var("MARKETMINER_SEARCH_BASE_URL") {
            config.crawler.search_base_url = v;
        }

        if let Ok(v) = std::env::var("MARKETMINER_PROXIES") {
            config.proxy.endpoints = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Ok(v) = std::env::var("MARKETMINER_SQLITE_PATH") {
            config.database.sqlite_path = v.into();
        }

        if let Ok(v) = std::env::var("MARKETMINER_LOG_LEVEL") {
            config.logging.level = v;
        }
        if let Ok(v) = std::env::var("MARKETMINER_LOG_FORMAT") {
            config.logging.format = v;
        }

        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.crawler.max_concurrent_requests == 0 {
            anyhow::bail!("max_concurrent_requests must be greater than 0");
        }

        if self.crawler.batch_size == 0 {
            anyhow::bail!("batch_size must be greater than 0");
        }

        if self.crawler.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.crawler.request_timeout_secs)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            proxy: ProxyConfig {
                endpoints: Vec::new(),
            },
            database: DatabaseConfig {
                sqlite_path: PathBuf::from("data/products.db"),
            },
            logging: LoggingConfig {
                level: String::from("info"),
                format: String::from("text"),
            },
        }
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 5,
            min_request_delay_ms: 2000,
            retry_status_codes: vec![500, 502, 503, 504, 400, 403, 404, 408],
            max_retries: 10,
            request_timeout_secs: 30,
            cache_ttl_secs: 3600,
            batch_size: 20,
            search_base_url: String::from(crate::crawler::url::DEFAULT_SEARCH_BASE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_concurrent_requests() {
        let mut config = Config::default();
        config.crawler.max_concurrent_requests = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_batch_size() {
        let mut config = Config::default();
        config.crawler.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_retry_codes_match_policy() {
        let config = CrawlerConfig::default();
        assert_eq!(
            config.retry_status_codes,
            vec![500, 502, 503, 504, 400, 403, 404, 408]
        );
        assert_eq!(config.max_retries, 10);
        assert_eq!(config.batch_size, 20);
    }

    #[test]
    fn test_request_timeout_conversion() {
        let config = Config::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_from_toml() {
        let toml_str = r#"
            [crawler]
            max_concurrent_requests = 3
            min_request_delay_ms = 500
            retry_status_codes = [500, 503]
            max_retries = 2
            request_timeout_secs = 10
            cache_ttl_secs = 60
            batch_size = 5
            search_base_url = "http://localhost:9999"

            [proxy]
            endpoints = ["10.0.0.1:8080:u:p"]

            [database]
            sqlite_path = "test.db"

            [logging]
            level = "debug"
            format = "json"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.crawler.max_concurrent_requests, 3);
        assert_eq!(config.crawler.batch_size, 5);
        assert_eq!(config.proxy.endpoints.len(), 1);
        assert_eq!(config.logging.format, "json");
        assert!(config.validate().is_ok());
    }
}
