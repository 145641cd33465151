//! Error types for the smart cache
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache and fetch layers.
///
/// A superseded or cancelled request has no variant here; the coordinator
/// reports it as `Ok(None)`.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Key has expired
    #[error("Key expired: {0}")]
    Expired(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Network unreachable or connection failure
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Upstream answered with a non-success status
    #[error("Upstream returned status {0}")]
    Status(u16),

    /// Response body was not valid JSON
    #[error("Malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Request did not settle within its timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// True for failures that came from the fetch capability rather than the store.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            CacheError::Transport(_)
                | CacheError::Status(_)
                | CacheError::Decode(_)
                | CacheError::Timeout(_)
        )
    }
}

impl From<reqwest::Error> for CacheError {
    fn from(err: reqwest::Error) -> Self {
        CacheError::Transport(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) | CacheError::Expired(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Transport(_) | CacheError::Status(_) | CacheError::Decode(_) => {
                StatusCode::BAD_GATEWAY
            }
            CacheError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the smart cache.
pub type Result<T> = std::result::Result<T, CacheError>;
