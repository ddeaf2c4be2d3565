//! Unit tests for the retry executor

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use workspace_exporter::api::{with_retry, ApiError, RetryError};

/// Counts how many times the wrapped call ran
#[derive(Clone, Default)]
struct CallCounter {
    calls: Arc<AtomicU32>,
}

impl CallCounter {
    fn bump(&self) -> u32 {
        self.calls.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[tokio::test]
async fn test_success_passes_through() {
    let counter = CallCounter::default();
    let inner = counter.clone();

    let result: Result<u32, RetryError<ApiError>> =
        with_retry(|| {
            let inner = inner.clone();
            async move {
                inner.bump();
                Ok(42)
            }
        }, 5)
        .await;

    assert_eq!(result.unwrap(), 42);
    assert_eq!(counter.count(), 1);
}

#[tokio::test]
async fn test_non_rate_limit_failure_propagates_immediately() {
    let counter = CallCounter::default();
    let inner = counter.clone();

    let result: Result<u32, RetryError<ApiError>> = with_retry(
        || {
            let inner = inner.clone();
            async move {
                inner.bump();
                Err(ApiError::Api("invalid_auth".to_string()))
            }
        },
        5,
    )
    .await;

    assert!(matches!(
        result,
        Err(RetryError::Call(ApiError::Api(ref message))) if message == "invalid_auth"
    ));
    assert_eq!(counter.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_retried_until_success() {
    let counter = CallCounter::default();
    let inner = counter.clone();

    let result: Result<&str, RetryError<ApiError>> = with_retry(
        || {
            let inner = inner.clone();
            async move {
                if inner.bump() < 3 {
                    Err(ApiError::RateLimited(Duration::from_secs(2)))
                } else {
                    Ok("page")
                }
            }
        },
        5,
    )
    .await;

    assert_eq!(result.unwrap(), "page");
    assert_eq!(counter.count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_exhaustion_sleeps_additively() {
    let counter = CallCounter::default();
    let inner = counter.clone();
    let suggested = Duration::from_secs(3);
    let max_retries = 4u32;

    let started = Instant::now();
    let result: Result<(), RetryError<ApiError>> = with_retry(
        || {
            let inner = inner.clone();
            async move {
                inner.bump();
                Err(ApiError::RateLimited(suggested))
            }
        },
        max_retries,
    )
    .await;

    assert!(matches!(
        result,
        Err(RetryError::Exhausted { attempts }) if attempts == max_retries
    ));
    // Initial call plus one call per retry
    assert_eq!(counter.count(), max_retries + 1);

    // Retry n sleeps (suggested + n) seconds: total = r*d + r(r+1)/2
    let expected: u64 = (1..=u64::from(max_retries))
        .map(|attempt| suggested.as_secs() + attempt)
        .sum();
    assert_eq!(started.elapsed(), Duration::from_secs(expected));
}

#[tokio::test(start_paused = true)]
async fn test_zero_retries_fails_on_first_rate_limit() {
    let counter = CallCounter::default();
    let inner = counter.clone();

    let result: Result<(), RetryError<ApiError>> = with_retry(
        || {
            let inner = inner.clone();
            async move {
                inner.bump();
                Err(ApiError::RateLimited(Duration::from_secs(1)))
            }
        },
        0,
    )
    .await;

    assert!(matches!(result, Err(RetryError::Exhausted { attempts: 0 })));
    assert_eq!(counter.count(), 1);
}
