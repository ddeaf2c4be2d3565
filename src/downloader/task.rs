//! Download task specification and terminal states

/// One requested file fetch.
///
/// `filename` is the destination key, a path relative to the scheduler's
/// output directory. Once accepted by
/// [`enqueue`](super::DownloadScheduler::enqueue), a task cannot be cancelled
/// or reordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    /// Destination path, relative to the scheduler's output directory
    pub filename: String,
    /// Source URL
    pub url: String,
    /// Re-download even when the destination already exists
    pub overwrite: bool,
    /// Send the scheduler's bearer token with the request
    pub use_auth: bool,
    /// Fail the task on a non-success (4xx/5xx) response instead of saving
    /// whatever the server returned
    pub fail_on_error_status: bool,
}

impl DownloadTask {
    /// Create a task with default flags: no overwrite, no auth, fail on
    /// error status.
    pub fn new(filename: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            url: url.into(),
            overwrite: false,
            use_auth: false,
            fail_on_error_status: true,
        }
    }

    /// Set whether an existing destination is overwritten.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Set whether the scheduler's bearer token is attached.
    pub fn use_auth(mut self, use_auth: bool) -> Self {
        self.use_auth = use_auth;
        self
    }

    /// Set whether a non-success response fails the task.
    pub fn fail_on_error_status(mut self, fail: bool) -> Self {
        self.fail_on_error_status = fail;
        self
    }
}

/// Terminal state of a successfully completed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Content was fetched and saved to the destination
    Downloaded,
    /// Destination already existed and `overwrite` was not set
    SkippedExisting,
}
