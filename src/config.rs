//! Configuration Module
//!
//! Handles loading and managing cache and fetch configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::fetch::TtlPolicy;

/// Runtime configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Base URL the default fetcher resolves request targets against
    pub api_base_url: String,
    /// Default per-request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Background sweep interval in seconds
    pub cleanup_interval: u64,
    /// Warm the cache with the preload batch at startup
    pub preload_on_start: bool,
    /// TTL in seconds for `/categories` resources
    pub ttl_categories: u64,
    /// TTL in seconds for `/stats` resources
    pub ttl_stats: u64,
    /// TTL in seconds for `/search` resources
    pub ttl_search: u64,
    /// TTL in seconds for `/assets` resources
    pub ttl_assets: u64,
    /// TTL in seconds for user resources
    pub ttl_user: u64,
    /// TTL in seconds for anything unclassified
    pub ttl_default: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `API_BASE_URL` - Upstream API base URL (default: http://localhost:8080)
    /// - `REQUEST_TIMEOUT_MS` - Default request timeout (default: 10000)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 60)
    /// - `PRELOAD_ON_START` - Run the preload batch at startup (default: true)
    /// - `TTL_CATEGORIES_SECS`, `TTL_STATS_SECS`, `TTL_SEARCH_SECS`,
    ///   `TTL_ASSETS_SECS`, `TTL_USER_SECS`, `TTL_DEFAULT_SECS` - category TTLs
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            api_base_url: env::var("API_BASE_URL").unwrap_or(defaults.api_base_url),
            request_timeout_ms: env_or("REQUEST_TIMEOUT_MS", defaults.request_timeout_ms),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            preload_on_start: env_or("PRELOAD_ON_START", defaults.preload_on_start),
            ttl_categories: env_or("TTL_CATEGORIES_SECS", defaults.ttl_categories),
            ttl_stats: env_or("TTL_STATS_SECS", defaults.ttl_stats),
            ttl_search: env_or("TTL_SEARCH_SECS", defaults.ttl_search),
            ttl_assets: env_or("TTL_ASSETS_SECS", defaults.ttl_assets),
            ttl_user: env_or("TTL_USER_SECS", defaults.ttl_user),
            ttl_default: env_or("TTL_DEFAULT_SECS", defaults.ttl_default),
        }
    }

    /// Default request timeout as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Builds the category TTL table from the configured values.
    pub fn ttl_policy(&self) -> TtlPolicy {
        TtlPolicy {
            categories: Duration::from_secs(self.ttl_categories),
            stats: Duration::from_secs(self.ttl_stats),
            search: Duration::from_secs(self.ttl_search),
            assets: Duration::from_secs(self.ttl_assets),
            user: Duration::from_secs(self.ttl_user),
            default: Duration::from_secs(self.ttl_default),
        }
    }
}

fn env_or<T: FromStr>(name: &str, fallback: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(fallback)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            api_base_url: "http://localhost:8080".to_string(),
            request_timeout_ms: 10_000,
            cleanup_interval: 60,
            preload_on_start: true,
            ttl_categories: 30 * 60,
            ttl_stats: 5 * 60,
            ttl_search: 2 * 60,
            ttl_assets: 3 * 60,
            ttl_user: 10 * 60,
            ttl_default: 5 * 60,
        }
    }
}
