// Bounded exponential-backoff retry around the outbound model calls.
// Fixed policy constants for the whole system; no jitter, no error
// inspection; any failure of the wrapped operation triggers a retry.

use std::future::Future;
use std::time::Duration;

use super::InsightError;

/// Maximum attempts per wrapped operation.
pub const MAX_ATTEMPTS: u32 = 3;

/// Base backoff delay in milliseconds; doubles after each failed attempt.
pub const BASE_DELAY_MS: u64 = 1_000;

/// Run `op` up to [`MAX_ATTEMPTS`] times, sleeping `BASE_DELAY_MS * 2^(n-1)`
/// between attempts. The last failure is re-raised once attempts are
/// exhausted; terminal failure is never swallowed.
pub async fn retry_with_backoff<T, F, Fut>(label: &str, mut op: F) -> Result<T, InsightError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, InsightError>>,
{
    let mut last_error: Option<InsightError> = None;

    for attempt in 1..=MAX_ATTEMPTS {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::warn!(
                    label,
                    attempt,
                    max_attempts = MAX_ATTEMPTS,
                    error = %e,
                    "operation failed"
                );
                last_error = Some(e);
                if attempt < MAX_ATTEMPTS {
                    let delay = BASE_DELAY_MS * 2u64.pow(attempt - 1);
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| InsightError::HttpClient("all retry attempts exhausted".into())))
}
