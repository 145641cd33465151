//! Tracked Resource
//!
//! Consumer-facing view of one request: `{ data, loading, error, cached }`
//! published through a watch channel, with `refetch` and `force_refresh`.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::warn;

use crate::fetch::{Consumer, FetchCoordinator, RequestOptions};

/// Observable state of a tracked request.
///
/// `cached` describes the outcome of the last load: it is false whenever
/// `error` is set, even though `data` still holds the previous value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceState {
    pub data: Option<Value>,
    pub loading: bool,
    pub error: Option<String>,
    pub cached: bool,
}

/// One request bound to its own consumer.
///
/// Only the newest load publishes a result; loads cancelled by a newer one
/// leave the state untouched. Dropping the resource cancels its in-flight load.
pub struct Resource {
    consumer: Consumer,
    target: String,
    options: RequestOptions,
    state: watch::Sender<ResourceState>,
}

impl Resource {
    pub fn new(coordinator: &FetchCoordinator, target: impl Into<String>, options: RequestOptions) -> Self {
        let (state, _) = watch::channel(ResourceState::default());
        Self {
            consumer: coordinator.consumer(),
            target: target.into(),
            options,
            state,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Current state snapshot.
    pub fn state(&self) -> ResourceState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<ResourceState> {
        self.state.subscribe()
    }

    /// Loads through the cache.
    pub async fn refetch(&self) {
        self.load(false).await;
    }

    /// Loads from the network, bypassing the cache.
    pub async fn force_refresh(&self) {
        self.load(true).await;
    }

    async fn load(&self, force_refresh: bool) {
        self.state.send_modify(|state| state.loading = true);

        match self
            .consumer
            .request(&self.target, &self.options, force_refresh)
            .await
        {
            Ok(Some(outcome)) => self.state.send_modify(|state| {
                state.data = Some(outcome.value);
                state.cached = outcome.source.is_cached();
                state.error = None;
                state.loading = false;
            }),
            // Superseded: the newer load owns the state
            Ok(None) => {}
            Err(err) => {
                warn!(resource = %self.target, error = %err, "load failed");
                self.state.send_modify(|state| {
                    state.error = Some(err.to_string());
                    state.cached = false;
                    state.loading = false;
                });
            }
        }
    }
}
