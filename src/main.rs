//! Smart Cache - caching fetch gateway
//!
//! Serves upstream API resources through the smart cache and exposes its
//! admin surface over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use smart_cache::api::{create_router, AppState};
use smart_cache::tasks::preload_with;
use smart_cache::{spawn_sweep_task, Config, HttpFetcher};

/// Main entry point for the smart cache gateway.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the shared store, HTTP fetcher and coordinator
/// 4. Start the background expiry sweep
/// 5. Warm the cache with the preload batch (in the background)
/// 6. Serve the admin/proxy router until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "smart_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Smart Cache gateway");

    let config = Config::from_env();
    info!(
        "Configuration loaded: upstream={}, timeout={}ms, port={}, cleanup_interval={}s",
        config.api_base_url, config.request_timeout_ms, config.server_port, config.cleanup_interval
    );

    let fetcher = HttpFetcher::new(&config.api_base_url, config.request_timeout())
        .context("failed to build HTTP client")?;
    let state = AppState::from_config(&config, Arc::new(fetcher));
    info!("Cache store initialized");

    let sweep_handle = spawn_sweep_task(state.cache().clone(), config.cleanup_interval);

    if config.preload_on_start {
        let coordinator = state.coordinator.clone();
        tokio::spawn(async move {
            preload_with(&coordinator).await;
        });
    }

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(sweep_handle))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the sweep task and allows graceful shutdown.
async fn shutdown_signal(sweep_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    sweep_handle.abort();
    warn!("Expiry sweep aborted");
}
