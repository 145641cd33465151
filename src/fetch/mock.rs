//! Scripted in-memory `Fetcher` for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{CacheError, Result};
use crate::fetch::{FetchResponse, Fetcher, RequestOptions};

#[derive(Debug, Clone)]
enum Outcome {
    Respond(FetchResponse),
    Fail(String),
}

#[derive(Debug, Clone)]
struct Step {
    delay: Duration,
    outcome: Outcome,
}

/// Replays scripted responses per target. The last step for a target repeats.
#[derive(Debug, Clone, Default)]
pub struct ScriptedFetcher {
    scripts: Arc<Mutex<HashMap<String, VecDeque<Step>>>>,
    calls: Arc<Mutex<Vec<(String, RequestOptions)>>>,
    completed: Arc<AtomicUsize>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, target: &str, delay: Duration, outcome: Outcome) {
        self.scripts
            .lock()
            .unwrap()
            .entry(target.to_string())
            .or_default()
            .push_back(Step { delay, outcome });
    }

    pub fn respond(self, target: &str, body: Value) -> Self {
        self.respond_after(target, Duration::ZERO, FetchResponse::json(200, &body))
    }

    pub fn respond_after(self, target: &str, delay: Duration, response: FetchResponse) -> Self {
        self.push(target, delay, Outcome::Respond(response));
        self
    }

    pub fn fail(self, target: &str, message: &str) -> Self {
        self.push(target, Duration::ZERO, Outcome::Fail(message.to_string()));
        self
    }

    /// Number of fetches started.
    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Number of fetches that ran to completion without being aborted.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn call(&self, index: usize) -> (String, RequestOptions) {
        self.calls.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, target: &str, options: &RequestOptions) -> Result<FetchResponse> {
        self.calls
            .lock()
            .unwrap()
            .push((target.to_string(), options.clone()));

        let step = {
            let mut scripts = self.scripts.lock().unwrap();
            let queue = scripts
                .get_mut(target)
                .ok_or_else(|| CacheError::Transport(format!("no route to {target}")))?;
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        };
        let step = step.ok_or_else(|| CacheError::Transport(format!("no route to {target}")))?;

        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);

        match step.outcome {
            Outcome::Respond(response) => Ok(response),
            Outcome::Fail(message) => Err(CacheError::Transport(message)),
        }
    }
}
