//! Fetch Module
//!
//! Request deduplication and caching on top of an injected fetch capability.

mod category;
mod coordinator;
mod fetcher;
mod request;
mod resource;

#[cfg(test)]
pub(crate) mod mock;

pub use category::{ResourceCategory, TtlPolicy};
pub use coordinator::{CacheSource, Consumer, FetchCoordinator, FetchOutcome};
pub use fetcher::{Fetcher, HttpFetcher};
pub use request::{request_key, upstream_cache_hit, FetchResponse, RequestOptions};
pub use resource::{Resource, ResourceState};
