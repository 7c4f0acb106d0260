//! Rate-limited HTTP client shared by the provider adapters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use gamecache_core::{Provider, ProviderError};
use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tracing::debug;

/// Longest error body carried into a `RequestFailed` message.
const MAX_ERROR_BODY: usize = 512;

/// HTTP client with a concurrency limit and a minimum interval between
/// requests.
pub struct RateLimitedClient {
    provider: Provider,
    client: Client,
    rate_limiter: Arc<Semaphore>,
    last_request: Arc<AtomicU64>,
    min_request_interval_ms: u64,
    start_time: Instant,
}

impl RateLimitedClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `provider` - Provider reported in errors
    /// * `timeout` - Per-request timeout
    /// * `requests_per_minute` - Outbound budget (clamped to at least 1)
    pub fn new(provider: Provider, timeout: Duration, requests_per_minute: u32) -> Result<Self, ProviderError> {
        let rpm = requests_per_minute.max(1);
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gamecache/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::Transport {
                provider,
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            provider,
            client,
            rate_limiter: Arc::new(Semaphore::new(rpm as usize)),
            last_request: Arc::new(AtomicU64::new(0)),
            min_request_interval_ms: (60_000 / rpm as u64).max(10),
            start_time: Instant::now(),
        })
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// The underlying client, for building requests.
    pub fn http(&self) -> &Client {
        &self.client
    }

    /// Send a request with rate limiting and decode a JSON response.
    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ProviderError> {
        let provider = self.provider;
        let _permit = self
            .rate_limiter
            .acquire()
            .await
            .map_err(|e| ProviderError::Transport {
                provider,
                reason: format!("rate limiter closed: {}", e),
            })?;

        self.wait_for_slot().await;

        let response = request.send().await.map_err(|e| map_send_error(provider, e))?;
        let status = response.status();
        debug!(provider = provider.as_str(), status = status.as_u16(), url = %response.url().path(), "provider response");

        if status.is_success() {
            return response.json().await.map_err(|e| ProviderError::InvalidResponse {
                provider,
                reason: format!("failed to parse response: {}", e),
            });
        }

        let retry_after_ms = parse_retry_after_ms(response.headers()).unwrap_or(0);
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        Err(match status {
            StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited {
                provider,
                retry_after_ms,
            },
            _ => ProviderError::RequestFailed {
                provider,
                status: status.as_u16(),
                message: truncate(body),
            },
        })
    }

    async fn wait_for_slot(&self) {
        let now_ms = self.start_time.elapsed().as_millis() as u64;
        let last_ms = self.last_request.load(Ordering::Relaxed);
        let elapsed = now_ms.saturating_sub(last_ms);

        if last_ms != 0 && elapsed < self.min_request_interval_ms {
            let wait_ms = self.min_request_interval_ms - elapsed;
            tokio::time::sleep(Duration::from_millis(wait_ms)).await;
        }

        self.last_request
            .store(self.start_time.elapsed().as_millis() as u64, Ordering::Relaxed);
    }
}

fn map_send_error(provider: Provider, e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout { provider }
    } else {
        ProviderError::Transport {
            provider,
            reason: format!("HTTP request failed: {}", e),
        }
    }
}

fn truncate(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}

/// `Retry-After` in milliseconds. Only the delta-seconds form is understood.
pub fn parse_retry_after_ms(headers: &HeaderMap) -> Option<u64> {
    headers
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
        .map(|seconds| (seconds * 1000.0) as u64)
}

impl std::fmt::Debug for RateLimitedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitedClient")
            .field("provider", &self.provider)
            .field("min_request_interval_ms", &self.min_request_interval_ms)
            .field("available_permits", &self.rate_limiter.available_permits())
            .finish()
    }
}
