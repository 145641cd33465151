//! Request DTOs for the admin API
//!
//! Defines the query parameters accepted by the HTTP endpoints.

use serde::Deserialize;

/// Query for the proxy endpoint (GET /fetch)
///
/// # Fields
/// - `target`: Upstream path to fetch, e.g. `/api/stats`
/// - `refresh`: Bypass the cache when true
#[derive(Debug, Clone, Deserialize)]
pub struct FetchQuery {
    /// Upstream request target
    pub target: String,
    /// Force a network round trip
    #[serde(default)]
    pub refresh: bool,
}

impl FetchQuery {
    /// Validates the query
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.target.trim().is_empty() {
            return Some("Target cannot be empty".to_string());
        }
        if !self.target.starts_with('/') {
            return Some("Target must be a path starting with '/'".to_string());
        }
        None
    }
}

/// Query for the invalidation endpoint (DELETE /cache)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClearQuery {
    /// Only keys starting with this prefix are removed; everything when absent
    #[serde(default)]
    pub prefix: Option<String>,
}
