//! Retry with exponential backoff for remote data requests.
//!
//! Retries transport failures (connection refused, timeouts) and 5xx
//! responses. 4xx responses and body errors are returned to the caller
//! without retry.

use std::time::Duration;

/// Total attempts, including the first.
pub(crate) const MAX_ATTEMPTS: u32 = 3;

/// Delay before the first retry; doubles each time (200ms, 400ms).
const BASE_DELAY_MS: u64 = 200;

/// Send a request built by `f`, retrying transient failures.
pub(crate) async fn retry_send<F, Fut>(
    endpoint: &str,
    f: F,
) -> Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    let mut attempt = 1;
    loop {
        let result = f().await;
        let transient = match &result {
            Ok(resp) => resp.status().is_server_error(),
            Err(e) => !e.is_builder(),
        };
        if !transient || attempt >= MAX_ATTEMPTS {
            return result;
        }
        let delay = Duration::from_millis(BASE_DELAY_MS * 2u64.pow(attempt - 1));
        match &result {
            Ok(resp) => tracing::warn!(
                endpoint,
                attempt,
                status = resp.status().as_u16(),
                "server error, retrying in {delay:?}"
            ),
            Err(e) => tracing::warn!(
                endpoint,
                attempt,
                error = %e,
                "request failed, retrying in {delay:?}"
            ),
        }
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
