//! Call-level retry with additive backoff

use super::RateLimitSignal;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Why a retried call ultimately failed.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E: std::error::Error> {
    /// The call kept signalling rate limiting through every allowed retry.
    #[error("rate limited call did not succeed within {attempts} retries")]
    Exhausted {
        /// Number of retries performed before giving up
        attempts: u32,
    },

    /// The call failed with something other than a rate-limit signal;
    /// propagated immediately without retrying.
    #[error(transparent)]
    Call(E),
}

/// Invoke `call`, retrying rate-limited failures with additive backoff.
///
/// On a rate-limit signal carrying a suggested delay `d`, retry `n` (counted
/// from 1) sleeps `d + n` seconds before calling again, so each successive
/// retry waits longer even for the same suggested delay. After `max_retries`
/// retries the call fails with [`RetryError::Exhausted`]. Any non-rate-limit
/// failure propagates immediately.
pub async fn with_retry<T, E, F, Fut>(mut call: F, max_retries: u32) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RateLimitSignal + std::error::Error,
{
    let mut attempt = 0u32;

    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let Some(delay) = err.retry_after() else {
                    return Err(RetryError::Call(err));
                };

                attempt += 1;
                if attempt > max_retries {
                    return Err(RetryError::Exhausted { attempts: max_retries });
                }

                warn!(
                    delay_secs = delay.as_secs(),
                    attempt,
                    max_retries,
                    "call rate limited, backing off"
                );

                sleep(delay + Duration::from_secs(u64::from(attempt))).await;
            }
        }
    }
}
