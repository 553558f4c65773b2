use rand::Rng;
use site_assets_core::{Error, Result, RetryPolicy};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Backoff delay for retry number `retry` (1-based), with jitter if enabled
pub fn retry_delay(policy: &RetryPolicy, retry: u32) -> Duration {
    let delay = policy.backoff(retry);
    if !policy.jitter {
        return delay;
    }
    let max_extra = (delay.as_millis() / 2) as u64;
    if max_extra == 0 {
        return delay;
    }
    delay + Duration::from_millis(rand::rng().random_range(0..=max_extra))
}

/// Run `op` until it succeeds, fails permanently, or the attempt budget is spent.
///
/// Only errors with [`Error::is_transient`] are retried. Cancellation wins
/// over both a running attempt and a backoff sleep.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    url: &str,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            result = op(attempt) => result,
        };

        match result {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let delay = retry_delay(policy, attempt);
                warn!(
                    url,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "transient download failure, retrying: {}",
                    e
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(Error::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
            }
            Err(e) => {
                if e.is_transient() {
                    warn!(url, attempts = attempt, "download failed after retries: {}", e);
                }
                return Err(e);
            }
        }
    }
}
