#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! HTTP retry helpers for the upstream data clients.
//!
//! Every upstream call (Overpass, the data catalog) goes through
//! [`send_bytes`] or [`send_json`] instead of calling
//! `reqwest::RequestBuilder::send()` directly, so transient failures
//! (timeouts, connection resets, HTTP 429, HTTP 5xx) are retried with
//! exponential backoff.
//!
//! ```ignore
//! let policy = RetryPolicy::default();
//! let bytes = ram_http::send_bytes(|| client.post(&url).body(query.clone()), &policy).await?;
//! ```

#[cfg(any(test, feature = "testing"))]
pub mod testing;

use std::time::Duration;

use serde::de::DeserializeOwned;

/// Errors returned by the retry helpers.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// Transport-level failure (connect, timeout, body read).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-retryable status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Response status code.
        status: u16,
        /// Final request URL.
        url: String,
    },

    /// The server kept answering with a retryable status.
    #[error("HTTP {status} from {url} after {attempts} attempts")]
    RetriesExhausted {
        /// Last response status code.
        status: u16,
        /// Final request URL.
        url: String,
        /// Number of requests sent.
        attempts: u32,
    },

    /// The response body was not the expected JSON document.
    #[error("Invalid JSON response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// How many times to retry and how long to wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on every subsequent retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    /// Five retries with 2s, 4s, 8s, 16s, 32s backoff (62s total).
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Policy that never waits between attempts.
    #[must_use]
    pub const fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
        }
    }

    /// Backoff before retry number `retry` (1-based).
    #[must_use]
    pub fn delay(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
    }
}

/// Sends a request and returns the raw response body.
///
/// `build_request` is called once per attempt since a
/// [`reqwest::RequestBuilder`] is consumed by `send()`. If the response
/// arrives but its body cannot be read, the whole request is re-sent.
///
/// # Errors
///
/// Returns [`HttpError`] if the request fails after all retries or the
/// server answers with a non-retryable status.
pub async fn send_bytes<F>(build_request: F, policy: &RetryPolicy) -> Result<Vec<u8>, HttpError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    let mut body_retry = 0;

    loop {
        let response = send_inner(&build_request, policy).await?;
        let url = response.url().to_string();

        match response.bytes().await {
            Ok(bytes) => return Ok(bytes.to_vec()),
            Err(e) if body_retry < policy.max_retries => {
                body_retry += 1;
                let delay = policy.delay(body_retry);
                log::warn!(
                    "Body read failed for {url} (body retry {body_retry}/{}), \
                     re-fetching in {delay:?}: {e}",
                    policy.max_retries
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                log::error!("Body read failed for {url}, giving up: {e}");
                return Err(HttpError::Request(e));
            }
        }
    }
}

/// Sends a request and parses the response body as JSON.
///
/// # Errors
///
/// Returns [`HttpError`] if the request fails (see [`send_bytes`]) or the
/// body does not deserialize into `T`.
pub async fn send_json<T, F>(build_request: F, policy: &RetryPolicy) -> Result<T, HttpError>
where
    T: DeserializeOwned,
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    let bytes = send_bytes(build_request, policy).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Core retry loop: returns the first 2xx/3xx response.
async fn send_inner<F>(
    build_request: &F,
    policy: &RetryPolicy,
) -> Result<reqwest::Response, HttpError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    let max_retries = policy.max_retries;
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = policy.delay(attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    attempt += 1;
                    continue;
                }
                return Err(HttpError::Request(e));
            }
            Ok(response) => {
                let status = response.status();
                let retryable =
                    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error();

                if retryable {
                    if attempt < max_retries {
                        log::warn!("  HTTP {status} from {}", response.url());
                        attempt += 1;
                        continue;
                    }
                    return Err(HttpError::RetriesExhausted {
                        status: status.as_u16(),
                        url: response.url().to_string(),
                        attempts: attempt + 1,
                    });
                }

                // 4xx other than 429 is permanent
                if status.is_client_error() {
                    return Err(HttpError::Status {
                        status: status.as_u16(),
                        url: response.url().to_string(),
                    });
                }

                return Ok(response);
            }
        }
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_decode() || e.is_request()
}
