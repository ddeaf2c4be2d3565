//! Bounded-concurrency download scheduling
//!
//! The [`DownloadScheduler`] dispatches file fetches against a limited number
//! of in-flight slots. Overflow waits in a FIFO queue; waiting tasks are
//! admitted only from the scheduler-owned loop inside
//! [`flush`](DownloadScheduler::flush), never from task bodies.
//!
//! # Overview
//!
//! 1. **Enqueue**: [`DownloadScheduler::enqueue`] accepts a [`DownloadTask`]
//!    and either starts it immediately or queues it, without blocking
//! 2. **Execute**: a running task skips destinations that already exist
//!    (unless `overwrite` is set), which is how interrupted runs resume
//!    without re-downloading
//! 3. **Flush**: [`DownloadScheduler::flush`] drains both the running set and
//!    the waiting queue; one task's failure never stops its siblings
//! 4. **Report**: failures from one flush cycle surface once, as an
//!    [`AggregateError`] carrying every [`FileDownloadError`]
//!
//! # Transport
//!
//! Fetching bytes is abstracted behind the [`FileFetcher`] trait; the default
//! [`HttpFetcher`] uses `reqwest` with an optional bearer token per task.

pub mod fetch;
pub mod scheduler;
pub mod task;

pub use fetch::{FetchedFile, FileFetcher, HttpFetcher};
pub use scheduler::DownloadScheduler;
pub use task::{DownloadTask, TaskOutcome};

/// Download errors
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Transport-level failure (connection, TLS, body read).
    #[error("network error: {0}")]
    Network(String),

    /// Non-success response for a task with `fail_on_error_status` set.
    #[error("HTTP status {status} for {url}")]
    ErrorStatus {
        /// Requested URL
        url: String,
        /// Response status code
        status: u16,
    },

    /// Filesystem error while creating directories or saving content.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error from [`DownloadScheduler::write_json`].
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The spawned task itself failed to complete.
    #[error("task failed to complete: {0}")]
    TaskFailed(String),
}

/// One task's failure, tagged with its source URL.
#[derive(Debug, thiserror::Error)]
#[error("{cause} (URL: {url})")]
pub struct FileDownloadError {
    /// URL of the failed fetch
    pub url: String,
    /// Underlying failure
    #[source]
    pub cause: DownloadError,
}

/// Every individual failure collected during one flush cycle.
#[derive(Debug, thiserror::Error)]
#[error("{} download(s) failed", .errors.len())]
pub struct AggregateError {
    /// Individual failures, in completion order
    pub errors: Vec<FileDownloadError>,
}
