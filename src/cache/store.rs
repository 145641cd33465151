//! Cache Store Module
//!
//! Main cache engine: key to entry mapping with per-entry TTL and
//! generation-guarded eviction.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tokio::task::AbortHandle;

use crate::cache::{CacheCounters, CacheEntry, CacheStats};
use crate::error::{CacheError, Result};

// == Cache Store ==
/// In-memory cache storage with per-entry TTL.
#[derive(Debug, Default)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Eviction timer of each stored key, aborted whenever the entry leaves
    timers: HashMap<String, AbortHandle>,
    /// Hit/miss/expiry counters
    counters: CacheCounters,
    /// Last generation handed out by `set`
    generation: u64,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty CacheStore.
    pub fn new() -> Self {
        Self::default()
    }

    // == Set ==
    /// Stores a value under `key` for `ttl`.
    ///
    /// An existing entry is fully replaced, its TTL clock restarts and its
    /// eviction timer is aborted. Returns the generation of the new entry,
    /// which a scheduled eviction must present to `evict_if_current`.
    pub fn set(&mut self, key: String, value: Value, ttl: Duration) -> u64 {
        self.generation += 1;
        self.abort_timer(&key);
        let entry = CacheEntry::new(value, ttl, self.generation);
        self.entries.insert(key, entry);
        self.generation
    }

    // == Attach Timer ==
    /// Hands the store the eviction timer for the entry of `generation`.
    ///
    /// If that entry is already gone or replaced the timer is aborted at once.
    pub fn attach_timer(&mut self, key: &str, generation: u64, timer: AbortHandle) {
        let current = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.generation == generation);
        if current {
            if let Some(previous) = self.timers.insert(key.to_string(), timer) {
                previous.abort();
            }
        } else {
            timer.abort();
        }
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Returns the value while the entry's age is within its own TTL. Stale
    /// entries are removed and reported as `Expired`; unknown keys as `NotFound`.
    pub fn get(&mut self, key: &str) -> Result<Value> {
        match self.entries.get(key) {
            Some(entry) if entry.is_expired() => {
                self.entries.remove(key);
                self.abort_timer(key);
                self.counters.record_expirations(1);
                self.counters.record_miss();
                Err(CacheError::Expired(key.to_string()))
            }
            Some(entry) => {
                let value = entry.value.clone();
                self.counters.record_hit();
                Ok(value)
            }
            None => {
                self.counters.record_miss();
                Err(CacheError::NotFound(key.to_string()))
            }
        }
    }

    /// Fresh value under `key`, without touching counters.
    pub fn peek(&self, key: &str) -> Option<Value> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone())
    }

    // == Has ==
    /// True iff `get` would currently return a value. Does not touch counters.
    pub fn has(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false)
    }

    // == Clear ==
    /// Removes every entry, or only keys starting with `prefix`.
    ///
    /// Returns the number of entries removed.
    pub fn clear(&mut self, prefix: Option<&str>) -> usize {
        let before = self.entries.len();
        match prefix {
            None => {
                self.entries.clear();
                for (_, timer) in self.timers.drain() {
                    timer.abort();
                }
            }
            Some(prefix) => {
                self.entries.retain(|key, _| !key.starts_with(prefix));
                self.timers.retain(|key, timer| {
                    let keep = !key.starts_with(prefix);
                    if !keep {
                        timer.abort();
                    }
                    keep
                });
            }
        }
        before - self.entries.len()
    }

    // == Evict If Current ==
    /// Removes `key` only if it still holds the entry of `generation`.
    ///
    /// Called by scheduled eviction timers from inside the timer task, so the
    /// handle is released rather than aborted.
    pub fn evict_if_current(&mut self, key: &str, generation: u64) -> bool {
        let current = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.generation == generation);
        if current {
            self.entries.remove(key);
            self.timers.remove(key);
            self.counters.record_eviction();
        }
        current
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.entries.remove(key);
            self.abort_timer(key);
        }
        self.counters.record_expirations(expired.len());
        expired.len()
    }

    // == Stats ==
    /// Returns a snapshot of entry count, keys, size and counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            scheduled_evictions: self.timers.len(),
            ..CacheStats::snapshot(
                &self.counters,
                self.entries.iter().map(|(k, e)| (k, e.size_bytes)),
            )
        }
    }

    /// Number of eviction timers still pending.
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn abort_timer(&mut self, key: &str) {
        if let Some(timer) = self.timers.remove(key) {
            timer.abort();
        }
    }
}
