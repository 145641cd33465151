//! Background Tasks Module
//!
//! Tasks that run beside the request path.
//!
//! # Tasks
//! - Preload: warms the cache with popular resources at startup
//! - Expiry sweep: removes stale entries at configured intervals

mod preload;
mod sweep;

pub use preload::{preload_popular_data, preload_with, PreloadReport, PRELOAD_TARGETS};
pub use sweep::spawn_sweep_task;
