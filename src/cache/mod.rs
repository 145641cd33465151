//! Cache Module
//!
//! Provides in-memory caching of fetch results with per-entry TTL,
//! deterministic keys and scheduled eviction.

mod entry;
pub mod key;
mod shared;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use key::generate_key;
pub use shared::SharedCache;
pub use stats::{CacheCounters, CacheStats};
pub use store::CacheStore;
