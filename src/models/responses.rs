//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheStats;
use crate::fetch::{CacheSource, FetchOutcome};

/// Response body for the proxy endpoint (GET /fetch)
#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    /// Cache key the result is stored under
    pub key: String,
    /// Parsed upstream body
    pub data: Value,
    /// True when served locally or reported cached by the upstream
    pub cached: bool,
    /// Where the value came from
    pub source: CacheSource,
}

impl From<FetchOutcome> for FetchResult {
    fn from(outcome: FetchOutcome) -> Self {
        Self {
            cached: outcome.source.is_cached(),
            key: outcome.key,
            data: outcome.value,
            source: outcome.source,
        }
    }
}

/// Response body for the invalidation endpoint (DELETE /cache)
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// Success message
    pub message: String,
    /// Number of entries removed
    pub removed: usize,
}

impl ClearResponse {
    /// Creates a new ClearResponse
    pub fn new(prefix: Option<&str>, removed: usize) -> Self {
        let message = match prefix {
            Some(prefix) => format!("Cleared {} entries with prefix '{}'", removed, prefix),
            None => format!("Cleared {} entries", removed),
        };
        Self { message, removed }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Store snapshot
    #[serde(flatten)]
    pub stats: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            stats,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
