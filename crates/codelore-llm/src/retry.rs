use std::future::Future;
use std::time::Duration;

use crate::error::LlmError;

/// Retry an HTTP request while the server answers 429, up to `max_retries`
/// extra attempts. The wait between attempts honors a numeric `Retry-After`
/// header when present and otherwise doubles, starting at one second.
/// Non-429 responses (including other error statuses) return immediately
/// for the caller to interpret.
///
/// # Errors
///
/// Returns `LlmError::RateLimited` once the attempt budget is spent, or the
/// transport failure wrapped as `LlmError::Http`.
pub(crate) async fn send_with_retry<F, Fut>(
    provider_name: &str,
    max_retries: u32,
    mut send: F,
) -> Result<reqwest::Response, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    let mut attempt: u32 = 0;
    loop {
        let response = send().await.map_err(LlmError::Http)?;
        if response.status() != reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Ok(response);
        }
        if attempt >= max_retries {
            tracing::warn!("{provider_name} still rate limited after {max_retries} retries");
            return Err(LlmError::RateLimited);
        }

        let wait = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .map_or_else(|| Duration::from_secs(1 << attempt), Duration::from_secs);
        tracing::warn!(
            "{provider_name} rate limited, waiting {}s before retry {}/{max_retries}",
            wait.as_secs(),
            attempt + 1
        );
        tokio::time::sleep(wait).await;
        attempt += 1;
    }
}
