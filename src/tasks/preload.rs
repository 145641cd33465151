//! Preload Task
//!
//! Warms the cache with resources that are almost always requested right
//! after startup. Runs outside any consumer and writes straight into the
//! shared store.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::cache::SharedCache;
use crate::error::{CacheError, Result};
use crate::fetch::{request_key, FetchCoordinator, Fetcher, RequestOptions, TtlPolicy};

/// Targets fetched by `preload_popular_data`.
pub const PRELOAD_TARGETS: [&str; 4] = [
    "/api/categories",
    "/api/assets?sort=popular&limit=12",
    "/api/stats",
    "/api/assets?sort=recent&limit=12",
];

/// Outcome of one preload batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PreloadReport {
    /// Targets that were fetched and stored
    pub loaded: Vec<String>,
    /// Targets that failed, with the error message
    pub failed: Vec<(String, String)>,
}

/// Fetches every `PRELOAD_TARGETS` entry concurrently and stores each success
/// under the key a consumer would use for `(target, RequestOptions::default())`.
///
/// Each request fails on its own: errors are logged and reported, never
/// propagated, and never stop the siblings.
pub async fn preload_popular_data(
    cache: &SharedCache,
    fetcher: Arc<dyn Fetcher>,
    policy: TtlPolicy,
    timeout: Duration,
) -> PreloadReport {
    preload_targets(cache, fetcher, policy, timeout, &PRELOAD_TARGETS).await
}

/// Runs the preload batch with the coordinator's store, fetcher and policy.
pub async fn preload_with(coordinator: &FetchCoordinator) -> PreloadReport {
    preload_popular_data(
        coordinator.cache(),
        coordinator.fetcher(),
        coordinator.policy(),
        coordinator.default_timeout(),
    )
    .await
}

async fn preload_targets(
    cache: &SharedCache,
    fetcher: Arc<dyn Fetcher>,
    policy: TtlPolicy,
    timeout: Duration,
    targets: &[&str],
) -> PreloadReport {
    let mut batch = JoinSet::new();
    for target in targets {
        let target = target.to_string();
        let fetcher = Arc::clone(&fetcher);
        let cache = cache.clone();
        batch.spawn(async move {
            let result = preload_one(&cache, fetcher.as_ref(), policy, timeout, &target).await;
            (target, result)
        });
    }

    let mut report = PreloadReport::default();
    while let Some(joined) = batch.join_next().await {
        match joined {
            Ok((target, Ok(()))) => report.loaded.push(target),
            Ok((target, Err(err))) => {
                warn!(resource = %target, error = %err, "preload failed");
                report.failed.push((target, err.to_string()));
            }
            Err(err) => warn!(error = %err, "preload task panicked"),
        }
    }

    info!(
        loaded = report.loaded.len(),
        failed = report.failed.len(),
        "preload batch finished"
    );
    report
}

async fn preload_one(
    cache: &SharedCache,
    fetcher: &dyn Fetcher,
    policy: TtlPolicy,
    timeout: Duration,
    target: &str,
) -> Result<()> {
    let options = RequestOptions::default();
    let key = request_key(target, &options)?;
    let response = tokio::time::timeout(timeout, fetcher.fetch(target, &options))
        .await
        .map_err(|_| CacheError::Timeout(timeout))??;
    let value = response.checked_body()?;
    cache.set(key, value, policy.ttl_for(target, None)).await;
    Ok(())
}
