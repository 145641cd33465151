//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with their own TTL.

use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
///
/// Entries are never mutated in place; a `set` on an existing key builds a
/// fresh entry with a new generation.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: Value,
    /// Monotonic insertion time used for expiry
    pub inserted_at: Instant,
    /// Lifetime of this entry
    pub ttl: Duration,
    /// Identity of this entry, unique within its store
    pub generation: u64,
    /// Approximate serialized size of the value in bytes
    pub size_bytes: usize,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry stamped with the current time.
    pub fn new(value: Value, ttl: Duration, generation: u64) -> Self {
        let size_bytes = serde_json::to_vec(&value).map(|b| b.len()).unwrap_or(0);
        Self {
            value,
            inserted_at: Instant::now(),
            ttl,
            generation,
            size_bytes,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has outlived its own TTL.
    ///
    /// An entry whose age equals its TTL is still fresh; it is expired only
    /// once the age strictly exceeds the TTL.
    pub fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() > self.ttl
    }
}
