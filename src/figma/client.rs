//! Authenticated Figma REST client with response caching and call accounting.
//!
//! One `FigmaClient` exists per process. It exclusively owns the response
//! cache and the API statistics; tool handlers go through the typed fetch
//! methods and never touch the cache directly.
//!
//! # Caching
//!
//! Read endpoints are cached under stable keys derived from resource
//! identity (`file:<key>`, `project:<id>`, `variables:<key>`). A cache hit
//! never triggers a network call; a miss or TTL expiry triggers exactly one.
//! Successful writes invalidate the affected `variables:` key so the next
//! read fetches fresh state.

use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::{Duration, Instant};

use regex::Regex;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::figma::cache::ResponseCache;
use crate::figma::error::UpstreamError;
use crate::figma::stats::ApiStats;
use crate::figma::types::{LocalVariables, ProjectFiles};

/// Identifying header sent with every request.
const USER_AGENT: &str = concat!("figma-variables-mcp/", env!("CARGO_PKG_VERSION"));

/// Injection-safe pattern for identifiers interpolated into endpoint paths.
///
/// Non-empty; excludes path separators, `..` sequences and control
/// characters by construction.
fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9:_-]+$").expect("static pattern compiles"))
}

/// Validates an identifier received from untrusted input before it is used
/// in an upstream endpoint path.
///
/// # Errors
///
/// Returns [`UpstreamError::InvalidIdentifier`] naming the field when the
/// value does not match the allowed pattern.
pub fn validate_identifier(field: &'static str, value: &str) -> Result<(), UpstreamError> {
    if identifier_pattern().is_match(value) {
        Ok(())
    } else {
        Err(UpstreamError::InvalidIdentifier { field })
    }
}

/// Authenticated client for the Figma REST API.
pub struct FigmaClient {
    http: reqwest::Client,
    token: String,
    base_url: String,
    cache: Mutex<ResponseCache>,
    stats: Mutex<ApiStats>,
}

impl FigmaClient {
    /// Creates a client for the production API.
    #[must_use]
    pub fn new(token: String, cache_capacity: usize, cache_ttl: Duration) -> Self {
        Self::with_base_url(token, "https://api.figma.com".to_string(), cache_capacity, cache_ttl)
    }

    /// Creates a client against an explicit base URL (used by tests).
    #[must_use]
    pub fn with_base_url(
        token: String,
        base_url: String,
        cache_capacity: usize,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache: Mutex::new(ResponseCache::new(cache_capacity, cache_ttl)),
            stats: Mutex::new(ApiStats::new()),
        }
    }

    /// Returns a snapshot of the accumulated call statistics.
    #[must_use]
    pub fn stats_snapshot(&self) -> ApiStats {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of entries currently cached. Exposed for tests and health
    /// diagnostics.
    #[must_use]
    pub fn cached_entries(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Performs one authenticated call against the API.
    ///
    /// Every call, success or failure, updates the statistics: a latency
    /// sample, the total/failed counters, the last-known rate-limit headroom
    /// and, on failure, the last-error record.
    ///
    /// # Errors
    ///
    /// Fails fast on an empty endpoint or missing token without touching the
    /// network. Otherwise returns [`UpstreamError::Transport`] for connection
    /// failures, [`UpstreamError::Api`] for non-2xx responses and
    /// [`UpstreamError::MalformedResponse`] when a 2xx body does not decode.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<Value, UpstreamError> {
        if endpoint.is_empty() {
            return Err(UpstreamError::EmptyEndpoint);
        }
        if self.token.trim().is_empty() {
            return Err(UpstreamError::MissingToken);
        }

        let url = format!("{}{endpoint}", self.base_url);
        let mut builder = self
            .http
            .request(method.clone(), url.as_str())
            .header("X-Figma-Token", &self.token)
            .header(reqwest::header::USER_AGENT, USER_AGENT);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        debug!(%method, endpoint, "Figma API request");
        let started = Instant::now();
        let response = builder.send().await;
        #[allow(clippy::cast_possible_truncation)]
        let latency_ms = started.elapsed().as_millis() as u64;

        let response = match response {
            Ok(response) => response,
            Err(source) => {
                let err = UpstreamError::Transport {
                    endpoint: endpoint.to_string(),
                    source,
                };
                self.record_failure(endpoint, latency_ms, &err, None, None);
                return Err(err);
            }
        };

        let status = response.status();
        let remaining = header_u64(&response, "x-ratelimit-remaining");
        let reset = header_u64(&response, "x-ratelimit-reset");

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = UpstreamError::Api {
                status: status.as_u16(),
                message: extract_error_message(&text),
            };
            self.record_failure(endpoint, latency_ms, &err, remaining, reset);
            return Err(err);
        }

        let text = match response.text().await {
            Ok(text) => text,
            Err(source) => {
                let err = UpstreamError::Transport {
                    endpoint: endpoint.to_string(),
                    source,
                };
                self.record_failure(endpoint, latency_ms, &err, remaining, reset);
                return Err(err);
            }
        };

        match serde_json::from_str::<Value>(&text) {
            Ok(value) => {
                let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
                stats.record_call(latency_ms, false);
                stats.record_rate_limit(remaining, reset);
                Ok(value)
            }
            Err(parse_err) => {
                let err = UpstreamError::MalformedResponse {
                    endpoint: endpoint.to_string(),
                    detail: parse_err.to_string(),
                };
                self.record_failure(endpoint, latency_ms, &err, remaining, reset);
                Err(err)
            }
        }
    }

    fn record_failure(
        &self,
        endpoint: &str,
        latency_ms: u64,
        err: &UpstreamError,
        remaining: Option<u64>,
        reset: Option<u64>,
    ) {
        warn!(endpoint, error = %err, "Figma API call failed");
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        stats.record_call(latency_ms, true);
        stats.record_rate_limit(remaining, reset);
        stats.record_error(endpoint, &err.to_string());
    }

    /// GET with cache lookup under `key`. A hit never touches the network.
    async fn get_cached(&self, key: &str, endpoint: &str) -> Result<Value, UpstreamError> {
        {
            let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(hit) = cache.get(key) {
                trace!(key, "cache hit");
                return Ok(hit);
            }
        }

        let value = self.request(Method::GET, endpoint, None).await?;

        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(key, value.clone());
        Ok(value)
    }

    fn invalidate(&self, key: &str) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .invalidate(key);
    }

    /// Fetches a file document. Cached under `file:<key>`.
    ///
    /// # Errors
    ///
    /// Propagates identifier-validation and request failures.
    pub async fn get_file(&self, file_key: &str) -> Result<Value, UpstreamError> {
        validate_identifier("fileKey", file_key)?;
        self.get_cached(&format!("file:{file_key}"), &format!("/v1/files/{file_key}"))
            .await
    }

    /// Lists the files of a project. Cached under `project:<id>`.
    ///
    /// # Errors
    ///
    /// Propagates identifier-validation and request failures; a body that
    /// does not match the expected shape is a malformed-response error.
    pub async fn get_project_files(&self, project_id: &str) -> Result<ProjectFiles, UpstreamError> {
        validate_identifier("projectId", project_id)?;
        let endpoint = format!("/v1/projects/{project_id}/files");
        let value = self
            .get_cached(&format!("project:{project_id}"), &endpoint)
            .await?;
        serde_json::from_value(value).map_err(|e| UpstreamError::MalformedResponse {
            endpoint,
            detail: e.to_string(),
        })
    }

    /// Fetches the local variables of a file. Cached under `variables:<key>`.
    ///
    /// Pass `fresh = true` to bypass the cache and fetch an authoritative
    /// snapshot (read-modify-write handlers must do this before validating
    /// individual targets).
    ///
    /// # Errors
    ///
    /// Propagates identifier-validation and request failures; a body that
    /// does not match the expected shape is a malformed-response error.
    pub async fn get_local_variables(
        &self,
        file_key: &str,
        fresh: bool,
    ) -> Result<LocalVariables, UpstreamError> {
        validate_identifier("fileKey", file_key)?;
        let key = format!("variables:{file_key}");
        if fresh {
            self.invalidate(&key);
        }
        let endpoint = format!("/v1/files/{file_key}/variables/local");
        let value = self.get_cached(&key, &endpoint).await?;
        serde_json::from_value(value).map_err(|e| UpstreamError::MalformedResponse {
            endpoint,
            detail: e.to_string(),
        })
    }

    /// Posts a variables mutation payload for a file.
    ///
    /// The payload follows the bulk-mutation shape of the variables API
    /// (action objects). On success the cached variables snapshot for the
    /// file is invalidated.
    ///
    /// # Errors
    ///
    /// Propagates identifier-validation and request failures.
    pub async fn post_variables(
        &self,
        file_key: &str,
        payload: &Value,
    ) -> Result<Value, UpstreamError> {
        validate_identifier("fileKey", file_key)?;
        let endpoint = format!("/v1/files/{file_key}/variables");
        let result = self.request(Method::POST, &endpoint, Some(payload)).await?;
        self.invalidate(&format!("variables:{file_key}"));
        Ok(result)
    }
}

/// Reads an integer response header, tolerating absence and junk values.
fn header_u64(response: &reqwest::Response, name: &str) -> Option<u64> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// Pulls the best-available message out of an error response body.
///
/// The variables endpoints answer `{"err": "..."}`, others use
/// `{"message": "..."}`; anything unparseable falls back to the raw text.
fn extract_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for field in ["err", "message", "error"] {
            if let Some(message) = value.get(field).and_then(Value::as_str) {
                return message.to_string();
            }
        }
    }
    if body.trim().is_empty() {
        "(empty response body)".to_string()
    } else {
        body.trim().to_string()
    }
}
