//! API Module
//!
//! HTTP handlers and routing for the cache admin and proxy API.
//!
//! # Endpoints
//! - `GET /fetch` - Fetch a target through the cache
//! - `DELETE /cache` - Clear all entries or a key prefix
//! - `GET /stats` - Cache statistics
//! - `POST /preload` - Run the preload batch
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
