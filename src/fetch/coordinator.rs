//! Fetch Coordinator
//!
//! Serves requests from the shared cache when possible, otherwise issues them
//! through the injected `Fetcher`, cancelling whatever the same consumer still
//! has in flight.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::error::Elapsed;
use tracing::{debug, warn};

use crate::cache::{CacheStats, SharedCache};
use crate::error::{CacheError, Result};
use crate::fetch::{
    request_key, upstream_cache_hit, FetchResponse, Fetcher, RequestOptions, ResourceCategory,
    TtlPolicy,
};

type FetchTask = JoinHandle<std::result::Result<Result<FetchResponse>, Elapsed>>;

// == Cache Source ==
/// Where a returned value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheSource {
    /// Fresh network round trip
    Network,
    /// Served from the local store without touching the network
    Local,
    /// Fetched, but the upstream reported serving it from its own cache
    Upstream,
}

impl CacheSource {
    pub fn is_cached(&self) -> bool {
        !matches!(self, CacheSource::Network)
    }
}

/// Successful result of `Consumer::request`.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub key: String,
    pub value: Value,
    pub source: CacheSource,
}

// == Fetch Coordinator ==
/// Shared part of the coordinator: store, fetcher and TTL policy.
#[derive(Clone)]
pub struct FetchCoordinator {
    cache: SharedCache,
    fetcher: Arc<dyn Fetcher>,
    policy: TtlPolicy,
    default_timeout: Duration,
}

impl FetchCoordinator {
    pub fn new(
        cache: SharedCache,
        fetcher: Arc<dyn Fetcher>,
        policy: TtlPolicy,
        default_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            fetcher,
            policy,
            default_timeout,
        }
    }

    /// New consumer with its own pending-request slot.
    pub fn consumer(&self) -> Consumer {
        Consumer {
            coordinator: self.clone(),
            pending: Mutex::new(PendingSlot::default()),
        }
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    pub fn fetcher(&self) -> Arc<dyn Fetcher> {
        Arc::clone(&self.fetcher)
    }

    pub fn policy(&self) -> TtlPolicy {
        self.policy
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Invalidates everything, or a whole key family by prefix.
    pub async fn clear(&self, prefix: Option<&str>) -> usize {
        self.cache.clear(prefix).await
    }

    pub async fn stats(&self) -> CacheStats {
        self.cache.stats().await
    }
}

// == Pending Request ==
struct PendingRequest {
    id: u64,
    abort: AbortHandle,
}

#[derive(Default)]
struct PendingSlot {
    next_id: u64,
    current: Option<PendingRequest>,
}

// == Consumer ==
/// One consumer instance. Holds at most one outstanding request; issuing a
/// new one cancels the previous. Dropping the consumer cancels too.
pub struct Consumer {
    coordinator: FetchCoordinator,
    pending: Mutex<PendingSlot>,
}

impl Consumer {
    /// Fetches `target`, going through the cache unless `force_refresh`.
    ///
    /// Returns `Ok(None)` when this request was cancelled or superseded before
    /// it could take effect; nothing is written to the cache in that case.
    /// Failures never write to the cache either.
    pub async fn request(
        &self,
        target: &str,
        options: &RequestOptions,
        force_refresh: bool,
    ) -> Result<Option<FetchOutcome>> {
        let key = request_key(target, options)?;
        let cache = &self.coordinator.cache;

        if !force_refresh {
            if let Some(value) = cache.get(&key).await {
                debug!(key = %key, "local cache hit");
                return Ok(Some(FetchOutcome {
                    key,
                    value,
                    source: CacheSource::Local,
                }));
            }
        }

        let category = options
            .category
            .unwrap_or_else(|| ResourceCategory::classify(target));
        let ttl = self.coordinator.policy.ttl(category);
        let timeout = options.timeout.unwrap_or(self.coordinator.default_timeout);
        let hinted = options
            .clone()
            .with_header("Cache-Control", format!("max-age={}", ttl.as_secs()));

        let (id, task) = self.issue(target, hinted, timeout).await;
        let joined = task.await;
        let current = self.settle(id).await;

        let response = match joined {
            Err(err) if err.is_cancelled() => {
                debug!(resource = %target, id, "request cancelled");
                return Ok(None);
            }
            Err(err) => return Err(CacheError::Internal(format!("fetch task failed: {err}"))),
            Ok(_) if !current => {
                debug!(resource = %target, id, "dropping superseded response");
                return Ok(None);
            }
            Ok(Err(_)) => {
                warn!(resource = %target, timeout_ms = timeout.as_millis() as u64, "request timed out");
                return Err(CacheError::Timeout(timeout));
            }
            Ok(Ok(result)) => result.inspect_err(|err| {
                warn!(resource = %target, error = %err, "request failed");
            })?,
        };

        if response.is_not_modified() {
            // Nothing new to store; answer with what we already hold
            return match cache.peek(&key).await {
                Some(value) => {
                    debug!(key = %key, "not modified, serving stored value");
                    Ok(Some(FetchOutcome {
                        key,
                        value,
                        source: CacheSource::Upstream,
                    }))
                }
                None => {
                    warn!(resource = %target, "not modified but nothing stored");
                    Err(CacheError::Status(response.status))
                }
            };
        }

        let value = response.checked_body().inspect_err(|err| {
            warn!(resource = %target, status = response.status, error = %err, "unusable response");
        })?;
        let source = if upstream_cache_hit(&response, &value) {
            CacheSource::Upstream
        } else {
            CacheSource::Network
        };
        cache.set(key.clone(), value.clone(), ttl).await;
        debug!(key = %key, category = category.as_str(), ?source, "stored fetch result");

        Ok(Some(FetchOutcome { key, value, source }))
    }

    /// Cancels the outstanding request, if any.
    pub async fn cancel(&self) {
        if let Some(previous) = self.pending.lock().await.current.take() {
            previous.abort.abort();
            debug!(id = previous.id, "request cancelled by consumer");
        }
    }

    /// True while a request issued by this consumer has not settled.
    pub async fn is_pending(&self) -> bool {
        self.pending.lock().await.current.is_some()
    }

    /// Swaps in a new pending request, aborting the previous one.
    async fn issue(&self, target: &str, options: RequestOptions, timeout: Duration) -> (u64, FetchTask) {
        let mut slot = self.pending.lock().await;
        slot.next_id += 1;
        let id = slot.next_id;

        if let Some(previous) = slot.current.take() {
            previous.abort.abort();
            debug!(id = previous.id, superseded_by = id, "cancelled superseded request");
        }

        let fetcher = self.coordinator.fetcher();
        let target = target.to_string();
        let task = tokio::spawn(async move {
            tokio::time::timeout(timeout, fetcher.fetch(&target, &options)).await
        });
        slot.current = Some(PendingRequest {
            id,
            abort: task.abort_handle(),
        });
        (id, task)
    }

    /// Clears the slot if it still holds `id`; returns whether it did.
    async fn settle(&self, id: u64) -> bool {
        let mut slot = self.pending.lock().await;
        let is_current = slot.current.as_ref().is_some_and(|pending| pending.id == id);
        if is_current {
            slot.current = None;
        }
        is_current
    }
}

impl Drop for Consumer {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.get_mut().current.take() {
            pending.abort.abort();
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::mock::ScriptedFetcher;
    use serde_json::json;

    fn coordinator(fetcher: &ScriptedFetcher) -> FetchCoordinator {
        FetchCoordinator::new(
            SharedCache::new(),
            Arc::new(fetcher.clone()),
            TtlPolicy::default(),
            Duration::from_secs(10),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_miss_then_local_hit() {
        let fetcher = ScriptedFetcher::new().respond("/api/stats", json!({"totalAssets": 42}));
        let coordinator = coordinator(&fetcher);
        let consumer = coordinator.consumer();
        let options = RequestOptions::default();

        let first = consumer.request("/api/stats", &options, false).await.unwrap().unwrap();
        assert_eq!(first.value, json!({"totalAssets": 42}));
        assert_eq!(first.source, CacheSource::Network);
        assert_eq!(fetcher.calls(), 1);

        let second = consumer.request("/api/stats", &options, false).await.unwrap().unwrap();
        assert_eq!(second.value, json!({"totalAssets": 42}));
        assert_eq!(second.source, CacheSource::Local);
        assert!(second.source.is_cached());
        assert_eq!(fetcher.calls(), 1, "cache hit must not touch the network");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_entry_lives_five_minutes() {
        let fetcher = ScriptedFetcher::new().respond("/api/stats", json!({"totalAssets": 42}));
        let coordinator = coordinator(&fetcher);
        let consumer = coordinator.consumer();
        let options = RequestOptions::default();

        let outcome = consumer.request("/api/stats", &options, false).await.unwrap().unwrap();

        tokio::time::sleep(Duration::from_secs(299)).await;
        assert!(coordinator.cache().has(&outcome.key).await);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!coordinator.cache().has(&outcome.key).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_category_ttls_applied() {
        let fetcher = ScriptedFetcher::new()
            .respond("/api/categories", json!(["art"]))
            .respond("/api/search?q=x", json!([]))
            .respond("/api/misc", json!({}));
        let coordinator = coordinator(&fetcher);
        let consumer = coordinator.consumer();
        let options = RequestOptions::default();

        let categories = consumer.request("/api/categories", &options, false).await.unwrap().unwrap();
        let search = consumer.request("/api/search?q=x", &options, false).await.unwrap().unwrap();
        let misc = consumer.request("/api/misc", &options, false).await.unwrap().unwrap();

        tokio::time::sleep(Duration::from_secs(2 * 60 + 1)).await;
        assert!(!coordinator.cache().has(&search.key).await);
        assert!(coordinator.cache().has(&misc.key).await);

        tokio::time::sleep(Duration::from_secs(3 * 60)).await;
        assert!(!coordinator.cache().has(&misc.key).await);
        assert!(coordinator.cache().has(&categories.key).await);

        tokio::time::sleep(Duration::from_secs(25 * 60)).await;
        assert!(!coordinator.cache().has(&categories.key).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_refresh_bypasses_cache() {
        let fetcher = ScriptedFetcher::new()
            .respond("/api/assets", json!([1]))
            .respond("/api/assets", json!([1, 2]));
        let coordinator = coordinator(&fetcher);
        let consumer = coordinator.consumer();
        let options = RequestOptions::default();

        consumer.request("/api/assets", &options, false).await.unwrap();
        let refreshed = consumer.request("/api/assets", &options, true).await.unwrap().unwrap();

        assert_eq!(refreshed.value, json!([1, 2]));
        assert_eq!(refreshed.source, CacheSource::Network);
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(coordinator.cache().get(&refreshed.key).await, Some(json!([1, 2])));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_hint_header_attached() {
        let fetcher = ScriptedFetcher::new().respond("/api/search?q=x", json!([]));
        let coordinator = coordinator(&fetcher);
        let consumer = coordinator.consumer();

        consumer
            .request("/api/search?q=x", &RequestOptions::default(), false)
            .await
            .unwrap();

        let (_, options) = fetcher.call(0);
        assert_eq!(options.headers.get("Cache-Control").map(String::as_str), Some("max-age=120"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_upstream_cache_flag() {
        let fetcher = ScriptedFetcher::new()
            .respond("/api/assets", json!({"cached": true, "items": []}))
            .respond_after(
                "/api/stats",
                Duration::ZERO,
                FetchResponse::json(200, &json!({})).with_header("X-Cache", "HIT"),
            );
        let coordinator = coordinator(&fetcher);
        let consumer = coordinator.consumer();
        let options = RequestOptions::default();

        let assets = consumer.request("/api/assets", &options, false).await.unwrap().unwrap();
        assert_eq!(assets.source, CacheSource::Upstream);

        let stats = consumer.request("/api/stats", &options, false).await.unwrap().unwrap();
        assert_eq!(stats.source, CacheSource::Upstream);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_modified_refresh_keeps_stored_value() {
        let not_modified = FetchResponse { status: 304, ..Default::default() };
        let fetcher = ScriptedFetcher::new()
            .respond("/api/categories", json!(["art", "music"]))
            .respond_after("/api/categories", Duration::ZERO, not_modified);
        let coordinator = coordinator(&fetcher);
        let consumer = coordinator.consumer();
        let options = RequestOptions::default();

        let first = consumer.request("/api/categories", &options, false).await.unwrap().unwrap();
        assert_eq!(first.source, CacheSource::Network);

        let refreshed = consumer.request("/api/categories", &options, true).await.unwrap().unwrap();
        assert_eq!(refreshed.value, json!(["art", "music"]));
        assert_eq!(refreshed.source, CacheSource::Upstream);
        assert_eq!(fetcher.calls(), 2);

        assert_eq!(coordinator.cache().peek(&first.key).await, Some(json!(["art", "music"])));
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_modified_without_stored_value_fails() {
        let not_modified = FetchResponse { status: 304, ..Default::default() };
        let fetcher = ScriptedFetcher::new().respond_after("/api/stats", Duration::ZERO, not_modified);
        let coordinator = coordinator(&fetcher);
        let consumer = coordinator.consumer();

        let err = consumer
            .request("/api/stats", &RequestOptions::default(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Status(304)));
        assert!(coordinator.cache().is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_surfaces_and_skips_cache() {
        let fetcher = ScriptedFetcher::new()
            .fail("/api/assets", "connection refused")
            .respond_after("/api/stats", Duration::ZERO, FetchResponse::json(500, &json!({})))
            .respond_after(
                "/api/categories",
                Duration::ZERO,
                FetchResponse { status: 200, body: b"not json".to_vec(), ..Default::default() },
            );
        let coordinator = coordinator(&fetcher);
        let consumer = coordinator.consumer();
        let options = RequestOptions::default();

        let err = consumer.request("/api/assets", &options, false).await.unwrap_err();
        assert!(matches!(err, CacheError::Transport(_)));

        let err = consumer.request("/api/stats", &options, false).await.unwrap_err();
        assert!(matches!(err, CacheError::Status(500)));

        let err = consumer.request("/api/categories", &options, false).await.unwrap_err();
        assert!(matches!(err, CacheError::Decode(_)));

        assert!(coordinator.cache().is_empty().await);
        assert!(!consumer.is_pending().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_failure() {
        let fetcher = ScriptedFetcher::new().respond_after(
            "/api/assets",
            Duration::from_secs(5),
            FetchResponse::json(200, &json!([])),
        );
        let coordinator = coordinator(&fetcher);
        let consumer = coordinator.consumer();
        let options = RequestOptions::default().with_timeout(Duration::from_secs(1));

        let err = consumer.request("/api/assets", &options, false).await.unwrap_err();
        assert!(matches!(err, CacheError::Timeout(t) if t == Duration::from_secs(1)));
        assert!(coordinator.cache().is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_request_cancels_previous() {
        let fetcher = ScriptedFetcher::new()
            .respond_after("/api/search?q=a", Duration::from_millis(100), FetchResponse::json(200, &json!("a")))
            .respond_after("/api/search?q=b", Duration::from_millis(10), FetchResponse::json(200, &json!("b")));
        let coordinator = coordinator(&fetcher);
        let consumer = Arc::new(coordinator.consumer());

        let first = {
            let consumer = Arc::clone(&consumer);
            tokio::spawn(async move {
                consumer
                    .request("/api/search?q=a", &RequestOptions::default(), false)
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(1)).await;

        let second = consumer
            .request("/api/search?q=b", &RequestOptions::default(), false)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.value, json!("b"));

        assert_eq!(first.await.unwrap().unwrap(), None);
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(fetcher.calls(), 2);
        assert_eq!(fetcher.completed(), 1, "superseded fetch must be aborted");
        let stats = coordinator.stats().await;
        assert_eq!(stats.keys, vec![second.key]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_consumers_do_not_cancel_each_other() {
        let fetcher = ScriptedFetcher::new()
            .respond_after("/api/assets", Duration::from_millis(50), FetchResponse::json(200, &json!(1)))
            .respond_after("/api/stats", Duration::from_millis(10), FetchResponse::json(200, &json!(2)));
        let coordinator = coordinator(&fetcher);
        let a = coordinator.consumer();
        let b = coordinator.consumer();
        let options = RequestOptions::default();

        let (ra, rb) = tokio::join!(
            a.request("/api/assets", &options, false),
            b.request("/api/stats", &options, false)
        );
        assert!(ra.unwrap().is_some());
        assert!(rb.unwrap().is_some());
        assert_eq!(coordinator.cache().len().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_resolves_silently() {
        let fetcher = ScriptedFetcher::new().respond_after(
            "/api/assets",
            Duration::from_millis(100),
            FetchResponse::json(200, &json!([])),
        );
        let coordinator = coordinator(&fetcher);
        let consumer = Arc::new(coordinator.consumer());

        let inflight = {
            let consumer = Arc::clone(&consumer);
            tokio::spawn(async move {
                consumer.request("/api/assets", &RequestOptions::default(), false).await
            })
        };
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(consumer.is_pending().await);

        consumer.cancel().await;
        assert_eq!(inflight.await.unwrap().unwrap(), None);
        assert!(coordinator.cache().is_empty().await);
        assert_eq!(fetcher.completed(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_consumer_aborts_fetch() {
        let fetcher = ScriptedFetcher::new().respond_after(
            "/api/assets",
            Duration::from_millis(100),
            FetchResponse::json(200, &json!([])),
        );
        let coordinator = coordinator(&fetcher);
        let consumer = coordinator.consumer();

        let view = tokio::spawn(async move {
            consumer.request("/api/assets", &RequestOptions::default(), false).await
        });
        tokio::time::sleep(Duration::from_millis(1)).await;
        view.abort();
        assert!(view.await.unwrap_err().is_cancelled());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(fetcher.completed(), 0);
        assert!(coordinator.cache().is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_prefix_forces_refetch() {
        let fetcher = ScriptedFetcher::new().respond("/api/stats", json!(1));
        let coordinator = coordinator(&fetcher);
        let consumer = coordinator.consumer();
        let options = RequestOptions::default();

        consumer.request("/api/stats", &options, false).await.unwrap();
        assert_eq!(coordinator.clear(Some("fetch_")).await, 1);

        let again = consumer.request("/api/stats", &options, false).await.unwrap().unwrap();
        assert_eq!(again.source, CacheSource::Network);
        assert_eq!(fetcher.calls(), 2);
    }
}
