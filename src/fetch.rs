//! Caching, retrying HTTP client for the upstream weather API
//!
//! Every outbound call carries a correlation header identifying the logical
//! request so upstream logs can be grouped. Responses are cached per unit of
//! work; server-side (5xx) errors are retried with exponential backoff and,
//! once exhausted, cached as terminal failures so later calls to the same
//! URL fail fast instead of re-running the retry schedule.

use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::cache::{CachedFetch, RequestCache};

/// Base URL for the National Weather Service API
const DEFAULT_BASE_URL: &str = "https://api.weather.gov";

/// Header carrying the correlation id for the logical request
const CORRELATION_HEADER: &str = "wx-gov-response-id";

/// The NWS API requires an identifying user agent
const USER_AGENT: &str = "wxgrid/0.1 (weather data normalization library)";

/// Total attempts for a server-side error class (1 initial + 4 retries)
const MAX_ATTEMPTS: u32 = 5;

/// First retry delay in milliseconds
const INITIAL_BACKOFF_MS: f64 = 75.0;

/// Multiplier applied to the delay after each retry
const BACKOFF_FACTOR: f64 = 1.65;

/// Default per-request timeout; a cancellation safety margin, the upstream
/// contract itself has no deadline
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur when fetching from the upstream API
///
/// `Transient` is the only retryable class; everything else fails the call
/// immediately. All variants are cloneable so a terminal failure can be
/// stored in the request cache and replayed.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Server-side error (5xx), retried up to the attempt budget
    #[error("upstream server error {status} for {url}")]
    Transient { status: u16, url: String },

    /// Non-5xx HTTP failure, not retried
    #[error("upstream request failed with status {status} for {url}")]
    Fatal { status: u16, url: String },

    /// Transport-level failure (connect, timeout), not retried
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// Response body was not valid JSON, not retried
    #[error("malformed payload from {url}: {message}")]
    MalformedPayload { url: String, message: String },
}

/// HTTP client for one unit of work
///
/// Owns the request-scoped cache and the correlation id; both live exactly
/// as long as the client. A new client is created per logical request.
#[derive(Debug)]
pub struct FetchClient {
    http: Client,
    base_url: String,
    correlation_id: String,
    timeout: Option<Duration>,
    cache: RequestCache,
}

impl FetchClient {
    /// Creates a client for a new unit of work with the given correlation id
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            correlation_id: correlation_id.into(),
            timeout: Some(Duration::from_secs(REQUEST_TIMEOUT_SECS)),
            cache: RequestCache::new(),
        }
    }

    /// Overrides the base URL that relative paths resolve against
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Uses a pre-configured HTTP client (custom TLS, proxies, user agent)
    pub fn with_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Sets the per-request timeout, or disables it with `None`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The correlation id sent with every call from this unit of work
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// The request-scoped cache, exposed for diagnostics
    pub fn cache(&self) -> &RequestCache {
        &self.cache
    }

    /// Fetches a JSON payload, consulting the cache before the network
    ///
    /// `path` may be absolute (`https://...`) or relative to the base URL.
    /// A cached payload is returned without a network call; a cached
    /// terminal failure is re-raised without a network call. On a 5xx the
    /// call is retried up to 5 total attempts with exponential backoff
    /// (75ms, then ×1.65 per attempt); any other failure is terminal
    /// immediately. Terminal failures are cached before propagating.
    pub async fn fetch(&self, path: &str) -> Result<Value, FetchError> {
        let url = self.resolve_url(path);

        if let Some(entry) = self.cache.get(&url) {
            return match entry.stored {
                CachedFetch::Payload(payload) => Ok(payload),
                CachedFetch::Failure(failure) => {
                    tracing::debug!(%url, "replaying cached terminal failure");
                    Err(failure)
                }
            };
        }

        let mut delay_ms = INITIAL_BACKOFF_MS;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.attempt(&url).await {
                Ok(payload) => {
                    self.cache.store_payload(&url, payload.clone());
                    return Ok(payload);
                }
                Err(error @ FetchError::Transient { .. }) if attempt < MAX_ATTEMPTS => {
                    tracing::warn!(
                        %url,
                        attempt,
                        delay_ms,
                        correlation_id = %self.correlation_id,
                        "transient upstream error, retrying: {error}"
                    );
                    tokio::time::sleep(Duration::from_secs_f64(delay_ms / 1000.0)).await;
                    delay_ms *= BACKOFF_FACTOR;
                }
                Err(error) => {
                    tracing::warn!(
                        %url,
                        attempt,
                        correlation_id = %self.correlation_id,
                        "upstream fetch failed terminally: {error}"
                    );
                    self.cache.store_failure(&url, error.clone());
                    return Err(error);
                }
            }
        }
    }

    /// One network attempt with no cache or retry involvement
    async fn attempt(&self, url: &str) -> Result<Value, FetchError> {
        let mut request = self
            .http
            .get(url)
            .header(CORRELATION_HEADER, &self.correlation_id)
            .header(reqwest::header::USER_AGENT, USER_AGENT);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| FetchError::Request {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(FetchError::Transient {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Fatal {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| FetchError::MalformedPayload {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    fn resolve_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }
}

/// The retry delays a call will sleep through before giving up
///
/// Kept separate from the fetch loop so the schedule is directly testable.
pub fn backoff_schedule() -> Vec<Duration> {
    let mut delays = Vec::with_capacity((MAX_ATTEMPTS - 1) as usize);
    let mut delay_ms = INITIAL_BACKOFF_MS;
    for _ in 1..MAX_ATTEMPTS {
        delays.push(Duration::from_secs_f64(delay_ms / 1000.0));
        delay_ms *= BACKOFF_FACTOR;
    }
    delays
}
