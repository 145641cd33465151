//! Shared Cache Handle
//!
//! Process-wide store handle passed explicitly to every consumer. Wraps the
//! store in `Arc<RwLock<_>>` and owns scheduled eviction.

use std::sync::{Arc, Weak};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task::AbortHandle;
use tracing::debug;

use crate::cache::{CacheStats, CacheStore};

// == Shared Cache ==
/// Cloneable handle to a single `CacheStore`.
///
/// Every method takes the lock once, so callers always observe a consistent
/// snapshot even while fetches complete concurrently.
#[derive(Debug, Clone, Default)]
pub struct SharedCache {
    inner: Arc<RwLock<CacheStore>>,
}

impl SharedCache {
    /// Creates a handle around an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key` and schedules its removal after `ttl`.
    ///
    /// The timer only evicts the exact entry written here. Replacing or
    /// clearing the key aborts it. Must be called from within a tokio runtime.
    pub async fn set(&self, key: impl Into<String>, value: Value, ttl: Duration) {
        let key = key.into();
        let mut store = self.inner.write().await;
        let generation = store.set(key.clone(), value, ttl);
        let timer = schedule_eviction(Arc::downgrade(&self.inner), key.clone(), generation, ttl);
        store.attach_timer(&key, generation, timer);
        debug!(key = %key, ttl_ms = ttl.as_millis() as u64, "cache set");
    }

    /// Returns the value for `key` if it is still fresh.
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.inner.write().await.get(key).ok()
    }

    /// Like `get`, but not counted as a hit or miss.
    pub async fn peek(&self, key: &str) -> Option<Value> {
        self.inner.read().await.peek(key)
    }

    /// True iff `get` would currently return a value.
    pub async fn has(&self, key: &str) -> bool {
        self.inner.read().await.has(key)
    }

    /// Removes all entries, or those whose key starts with `prefix`.
    pub async fn clear(&self, prefix: Option<&str>) -> usize {
        let removed = self.inner.write().await.clear(prefix);
        debug!(prefix = ?prefix, removed, "cache cleared");
        removed
    }

    /// Sweeps every stale entry.
    pub async fn cleanup_expired(&self) -> usize {
        self.inner.write().await.cleanup_expired()
    }

    /// Consistent snapshot of size, keys and approximate memory usage.
    pub async fn stats(&self) -> CacheStats {
        self.inner.read().await.stats()
    }

    /// Eviction timers currently alive.
    pub async fn pending_timers(&self) -> usize {
        self.inner.read().await.pending_timers()
    }

    /// Current number of entries.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// True when the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

fn schedule_eviction(
    store: Weak<RwLock<CacheStore>>,
    key: String,
    generation: u64,
    ttl: Duration,
) -> AbortHandle {
    let timer = tokio::spawn(async move {
        tokio::time::sleep(ttl).await;
        let Some(store) = store.upgrade() else {
            return;
        };
        if store.write().await.evict_if_current(&key, generation) {
            debug!(key = %key, "scheduled eviction");
        }
    });
    timer.abort_handle()
}
