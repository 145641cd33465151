//! API Handlers
//!
//! HTTP request handlers for the cache admin and proxy endpoints.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};

use crate::cache::SharedCache;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::fetch::{FetchCoordinator, Fetcher, RequestOptions};
use crate::models::{
    ClearQuery, ClearResponse, FetchQuery, FetchResult, HealthResponse, StatsResponse,
};
use crate::tasks::{preload_with, PreloadReport};

/// Application state shared across all handlers.
///
/// Holds the coordinator, which in turn owns the shared cache handle.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: FetchCoordinator,
}

impl AppState {
    /// Creates a new AppState around an existing coordinator.
    pub fn new(coordinator: FetchCoordinator) -> Self {
        Self { coordinator }
    }

    /// Creates a new AppState from configuration, with a fresh store.
    pub fn from_config(config: &Config, fetcher: Arc<dyn Fetcher>) -> Self {
        let coordinator = FetchCoordinator::new(
            SharedCache::new(),
            fetcher,
            config.ttl_policy(),
            config.request_timeout(),
        );
        Self::new(coordinator)
    }

    pub fn cache(&self) -> &SharedCache {
        self.coordinator.cache()
    }
}

/// Handler for GET /fetch
///
/// Fetches `target` through the coordinator with a one-shot consumer.
pub async fn fetch_handler(
    State(state): State<AppState>,
    Query(query): Query<FetchQuery>,
) -> Result<Json<FetchResult>> {
    if let Some(error_msg) = query.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let consumer = state.coordinator.consumer();
    let outcome = consumer
        .request(&query.target, &RequestOptions::default(), query.refresh)
        .await?
        .ok_or_else(|| CacheError::Internal("request was cancelled".to_string()))?;

    Ok(Json(outcome.into()))
}

/// Handler for DELETE /cache
///
/// Clears the whole cache, or only keys starting with `prefix`.
pub async fn clear_handler(
    State(state): State<AppState>,
    Query(query): Query<ClearQuery>,
) -> Json<ClearResponse> {
    let prefix = query.prefix.as_deref();
    let removed = state.coordinator.clear(prefix).await;
    Json(ClearResponse::new(prefix, removed))
}

/// Handler for GET /stats
///
/// Returns a consistent snapshot of the store.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.coordinator.stats().await.into())
}

/// Handler for POST /preload
///
/// Runs the preload batch and reports which targets were warmed.
pub async fn preload_handler(State(state): State<AppState>) -> Json<PreloadReport> {
    Json(preload_with(&state.coordinator).await)
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
