//! Request and Response Types
//!
//! Transport-neutral description of a fetch and of what came back.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::generate_key;
use crate::cache::key::FETCH_RESOURCE;
use crate::error::{CacheError, Result};
use crate::fetch::ResourceCategory;

// == Request Options ==
/// Options for a single fetch.
///
/// `method`, `headers` and `body` identify the request and take part in its
/// cache key. `timeout` and `category` only steer how it is executed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Per-request timeout; the coordinator default applies when unset
    #[serde(skip)]
    pub timeout: Option<Duration>,
    /// Explicit category, bypassing path classification
    #[serde(skip)]
    pub category: Option<ResourceCategory>,
}

impl RequestOptions {
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_category(mut self, category: ResourceCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// HTTP method, defaulting to GET.
    pub fn method(&self) -> &str {
        self.method.as_deref().unwrap_or("GET")
    }
}

// == Request Key ==
/// Cache key for a fetch: `generate_key("fetch", {target, ...options})`.
pub fn request_key(target: &str, options: &RequestOptions) -> Result<String> {
    let params = serde_json::to_value(options)
        .map_err(|err| CacheError::Internal(format!("unserializable request options: {err}")))?;
    let mut params = match params {
        Value::Object(map) => map,
        _ => return Err(CacheError::Internal("request options must serialize to an object".to_string())),
    };
    params.insert("target".to_string(), Value::String(target.to_string()));
    Ok(generate_key(
        FETCH_RESOURCE,
        params.iter().map(|(k, v)| (k.as_str(), v)),
    ))
}

// == Fetch Response ==
/// Raw response returned by a `Fetcher`.
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    pub status: u16,
    /// Header names are lowercase
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Response carrying `body` serialized as JSON.
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.to_string().into_bytes(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Header lookup, case-insensitive on the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_modified(&self) -> bool {
        self.status == 304
    }

    /// Parses the body as JSON. An empty body parses as `null`.
    pub fn parse_body(&self) -> Result<Value> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Parses the body of a 2xx response; any other status is an error.
    pub fn checked_body(&self) -> Result<Value> {
        if !self.is_success() {
            return Err(CacheError::Status(self.status));
        }
        self.parse_body()
    }
}

// == Upstream Cache Detection ==
/// True when the upstream reports it served `body` from its own cache: a
/// truthy `cached` body field, an `X-Cache: HIT` header, or a 304 status.
pub fn upstream_cache_hit(response: &FetchResponse, body: &Value) -> bool {
    let flagged = body.get("cached").is_some_and(is_truthy);
    let header_hit = response
        .header("x-cache")
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("HIT"));
    flagged || header_hit || response.is_not_modified()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
