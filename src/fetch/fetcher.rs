//! Fetch Capability
//!
//! The injected asynchronous fetch seam and its default HTTP implementation.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;

use crate::error::{CacheError, Result};
use crate::fetch::{FetchResponse, RequestOptions};

// == Fetcher Port ==
/// Asynchronous fetch capability consumed by the coordinator and preloader.
///
/// Implementations need not handle cancellation themselves: callers abort the
/// task driving the future.
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    async fn fetch(&self, target: &str, options: &RequestOptions) -> Result<FetchResponse>;
}

// == HTTP Fetcher ==
/// `Fetcher` backed by a `reqwest::Client`, resolving targets against a base URL.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Absolute targets pass through; paths are joined to the base URL.
    pub fn url_for(&self, target: &str) -> String {
        if target.starts_with("http://") || target.starts_with("https://") {
            target.to_string()
        } else if target.starts_with('/') {
            format!("{}{}", self.base_url, target)
        } else {
            format!("{}/{}", self.base_url, target)
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, target: &str, options: &RequestOptions) -> Result<FetchResponse> {
        let method = Method::from_bytes(options.method().as_bytes())
            .map_err(|e| CacheError::InvalidRequest(e.to_string()))?;

        let mut builder = self.client.request(method, self.url_for(target));
        for (name, value) in &options.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &options.body {
            builder = builder.json(body);
        }
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }
}
