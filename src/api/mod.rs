//! Retry and pagination wrappers for rate-limited remote calls
//!
//! Remote workspace APIs throttle aggressively. [`with_retry`] turns a
//! single call into a bounded retry loop that honors the server-suggested
//! delay with additive backoff, and [`PagedSequence`] turns a paginated call
//! into a restartable lazy sequence of pages where a mid-stream rate limit
//! only delays the next page, never the pages already produced.
//!
//! The remote call itself is a collaborator: any error type implementing
//! [`RateLimitSignal`] works. [`ApiError`] is a ready-made error type for
//! callers without their own.

use std::time::Duration;

pub mod pages;
pub mod retry;

pub use pages::{Page, PagedSequence, PaginationError};
pub use retry::{with_retry, RetryError};

/// Distinguishes rate-limit failures, which carry a server-suggested delay,
/// from every other failure.
pub trait RateLimitSignal {
    /// The suggested delay when this failure is a rate-limit signal,
    /// `None` otherwise.
    fn retry_after(&self) -> Option<Duration>;
}

/// Remote API call errors for callers that do not bring their own type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server asked the caller to back off for the given duration.
    #[error("rate limited, retry after {0:?}")]
    RateLimited(Duration),

    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The API returned an error response.
    #[error("API error: {0}")]
    Api(String),
}

impl RateLimitSignal for ApiError {
    fn retry_after(&self) -> Option<Duration> {
        match self {
            ApiError::RateLimited(delay) => Some(*delay),
            _ => None,
        }
    }
}
