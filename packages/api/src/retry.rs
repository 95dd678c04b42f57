//! Retry with exponential backoff for backend requests.
//!
//! Every request goes through [`send_json`] rather than calling
//! `reqwest::RequestBuilder::send()` directly, so connection failures,
//! timeouts, rate limiting and server errors are retried uniformly.

use std::time::Duration;

use crate::ApiError;

/// Delay before the first retry; doubles on each further attempt.
const BASE_DELAY: Duration = Duration::from_millis(250);

/// Upper bound on a single backoff delay.
const MAX_DELAY: Duration = Duration::from_secs(8);

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 300;

/// Sends a request and parses the body as JSON.
///
/// `build_request` is called once per attempt because builders are
/// consumed by `send()`. Up to `max_retries` retries are made for
/// transient failures; HTTP 4xx other than 429 fail immediately.
///
/// # Errors
///
/// Returns [`ApiError`] if the request still fails after all retries, the
/// server answers with a permanent error status, or the body is not JSON.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(build_request: F, max_retries: u32) -> Result<serde_json::Value, ApiError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = send_inner(&build_request, max_retries).await?;
    let url = response.url().to_string();
    let text = response.text().await?;

    serde_json::from_str(&text).map_err(|e| {
        let preview: String = text.chars().take(BODY_PREVIEW_LEN).collect();
        log::warn!(
            "JSON parse failed for {url} ({} bytes): {e}\n  body preview: {preview}",
            text.len()
        );
        ApiError::Json(e)
    })
}

#[allow(clippy::future_not_send)]
async fn send_inner<F>(build_request: &F, max_retries: u32) -> Result<reqwest::Response, ApiError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            let delay = backoff_delay(attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        let error = match build_request().send().await {
            Err(e) if is_transient(&e) => {
                log::warn!("  transient error: {e}");
                ApiError::Http(e)
            }
            Err(e) => return Err(ApiError::Http(e)),
            Ok(response) => {
                let status = response.status();
                if status.is_success() || status.is_redirection() {
                    return Ok(response);
                }
                let error = ApiError::Status {
                    status: status.as_u16(),
                    message: status
                        .canonical_reason()
                        .unwrap_or("unexpected status")
                        .to_string(),
                };
                if !error.is_retryable() {
                    return Err(error);
                }
                log::warn!("  HTTP {status} from {}", response.url());
                error
            }
        };

        if attempt >= max_retries {
            return Err(error);
        }
        attempt += 1;
    }
}

/// Backoff before retry number `attempt` (1-based).
fn backoff_delay(attempt: u32) -> Duration {
    let factor = 1u32 << attempt.saturating_sub(1).min(16);
    BASE_DELAY.saturating_mul(factor).min(MAX_DELAY)
}

/// Returns `true` if the error is likely transient and worth retrying.
pub(crate) fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
}
