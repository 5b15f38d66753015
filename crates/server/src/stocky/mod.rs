//! Stocky purchase-order API client.
//!
//! # API Reference
//!
//! - Base URL: `https://stocky.shopifyapps.com/api/v2`
//! - Authentication: `Authorization: API KEY=<key>` plus a `Store-Name` header
//! - Pagination: `limit`/`offset` query parameters; a page shorter than
//!   `limit` marks the end
//!
//! Stocky rate-limits aggressively, so every request goes through a retry
//! loop with exponential backoff seeded from the server's `Retry-After` hint.

mod types;

pub use types::{PurchaseItem, PurchaseOrder, PurchaseOrderPage};

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::instrument;

use crate::config::StockyConfig;

/// Request timeout for Stocky calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors that can occur when interacting with the Stocky API.
#[derive(Debug, Error)]
pub enum StockyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limited and retries exhausted.
    #[error("Rate limited by Stocky after {0} attempts")]
    RateLimitExhausted(u32),

    /// Unauthorized (invalid API key).
    #[error("Unauthorized: invalid API key")]
    Unauthorized,

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Retry behavior for rate-limited requests.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts before giving up.
    pub max_attempts: u32,
    /// Minimum backoff before the first retry.
    pub floor: Duration,
    /// Backoff ceiling.
    pub cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            floor: Duration::from_millis(1000),
            cap: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (0-based), given the server's
    /// `Retry-After` hint in seconds.
    ///
    /// The hint (or the floor, whichever is larger) doubles per attempt and
    /// is clamped to the cap.
    #[must_use]
    pub fn backoff(&self, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
        let base = retry_after_secs
            .map_or(self.floor, Duration::from_secs)
            .max(self.floor);
        base.saturating_mul(2u32.saturating_pow(attempt)).min(self.cap)
    }
}

/// Stocky API client.
///
/// Cheap to clone; all state lives behind an `Arc`.
#[derive(Clone)]
pub struct StockyClient {
    inner: Arc<StockyClientInner>,
}

struct StockyClientInner {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl StockyClient {
    /// Create a new Stocky API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StockyConfig) -> Result<Self, StockyError> {
        Self::with_retry(config, RetryPolicy::default())
    }

    /// Create a client with an explicit retry policy.
    ///
    /// Tests shrink the backoff floor so rate-limit paths run in
    /// milliseconds.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn with_retry(config: &StockyConfig, retry: RetryPolicy) -> Result<Self, StockyError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("API KEY={}", config.api_key.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| StockyError::Parse(format!("Invalid API key format: {e}")))?,
        );
        headers.insert(
            "Store-Name",
            HeaderValue::from_str(&config.store_name)
                .map_err(|e| StockyError::Parse(format!("Invalid store name: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(StockyClientInner {
                client,
                base_url: config.base_url.clone(),
                retry,
            }),
        })
    }

    /// Fetch one page of purchase orders starting at `offset` records.
    ///
    /// # Errors
    ///
    /// Returns `StockyError::RateLimitExhausted` when every attempt was
    /// answered with 429, or another `StockyError` for other failures.
    #[instrument(skip(self))]
    pub async fn fetch_purchase_orders(
        &self,
        offset: i64,
        limit: u32,
    ) -> Result<PurchaseOrderPage, StockyError> {
        let url = format!(
            "{}/purchase_orders.json?limit={limit}&offset={offset}",
            self.inner.base_url
        );

        let retry = self.inner.retry;
        for attempt in 0..retry.max_attempts {
            let response = self.inner.client.get(&url).send().await?;
            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse().ok());
                let delay = retry.backoff(attempt, retry_after);
                tracing::warn!(
                    offset,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Stocky rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            if status == reqwest::StatusCode::UNAUTHORIZED
                || status == reqwest::StatusCode::FORBIDDEN
            {
                return Err(StockyError::Unauthorized);
            }

            if !status.is_success() {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(StockyError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            return response
                .json()
                .await
                .map_err(|e| StockyError::Parse(format!("Failed to parse response: {e}")));
        }

        Err(StockyError::RateLimitExhausted(retry.max_attempts))
    }
}

impl std::fmt::Debug for StockyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StockyClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}
