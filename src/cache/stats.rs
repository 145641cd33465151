//! Cache Statistics Module
//!
//! Tracks cache counters and builds diagnostic snapshots of the store.

use serde::Serialize;

// == Cache Counters ==
/// Running counters kept by the store.
#[derive(Debug, Clone, Default)]
pub struct CacheCounters {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found or expired)
    pub misses: u64,
    /// Number of entries dropped lazily or by the sweep because they were stale
    pub expirations: u64,
    /// Number of entries removed by their scheduled eviction timer
    pub evictions: u64,
}

impl CacheCounters {
    /// Increments the hit counter.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    /// Increments the miss counter.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// Adds to the expiration counter.
    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    /// Increments the eviction counter.
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }
}

// == Cache Stats ==
/// Point-in-time snapshot of the store for diagnostics.
///
/// `approx_bytes` is the sum of key lengths and serialized value sizes. It is
/// informational only and never drives eviction.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Current number of entries in the cache
    pub total_entries: usize,
    /// Keys currently held, sorted
    pub keys: Vec<String>,
    /// Approximate memory footprint in bytes
    pub approx_bytes: usize,
    /// Eviction timers still waiting to fire
    pub scheduled_evictions: usize,
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// Builds a snapshot from counters and the current key/size listing.
    pub fn snapshot<'a, I>(counters: &CacheCounters, entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, usize)>,
    {
        let mut keys = Vec::new();
        let mut approx_bytes = 0;
        for (key, size) in entries {
            approx_bytes += key.len() + size;
            keys.push(key.clone());
        }
        keys.sort();

        Self {
            total_entries: keys.len(),
            keys,
            approx_bytes,
            scheduled_evictions: 0,
            hits: counters.hits,
            misses: counters.misses,
            expirations: counters.expirations,
            evictions: counters.evictions,
        }
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
