//! Smart Cache - keyed TTL caching and request deduplication for API clients
//!
//! Caches asynchronous fetch results under deterministic keys, cancels
//! superseded in-flight requests per consumer, assigns TTLs by resource
//! category and warms the cache at startup.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::SharedCache;
pub use config::Config;
pub use error::{CacheError, Result};
pub use fetch::{FetchCoordinator, Fetcher, HttpFetcher, RequestOptions, Resource};
pub use tasks::{preload_popular_data, spawn_sweep_task};
