//! Download scheduler with bounded concurrency and aggregated failures

use super::fetch::{FileFetcher, HttpFetcher};
use super::task::{DownloadTask, TaskOutcome};
use super::{AggregateError, DownloadError, FileDownloadError};
use futures_util::future;
use serde::Serialize;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, warn};

type TaskHandle = JoinHandle<Result<TaskOutcome, DownloadError>>;

/// Bounded-concurrency task queue for fetching and saving files.
///
/// At no point do more than `concurrency` tasks run simultaneously; overflow
/// waits in a FIFO queue and is admitted only from the admission loop inside
/// [`flush`](DownloadScheduler::flush). The scheduler exclusively owns both
/// collections; an accepted task cannot be cancelled or reordered.
pub struct DownloadScheduler {
    output_directory: PathBuf,
    bearer_token: Option<String>,
    concurrency: usize,
    fetcher: Arc<dyn FileFetcher>,
    running: Vec<(String, TaskHandle)>,
    waiting: VecDeque<DownloadTask>,
    pending_failures: Vec<FileDownloadError>,
}

impl DownloadScheduler {
    /// Create a scheduler saving under `output_directory` with the default
    /// HTTP transport.
    ///
    /// `bearer_token` is attached only to tasks that set
    /// [`use_auth`](DownloadTask::use_auth).
    pub fn new(
        output_directory: impl Into<PathBuf>,
        bearer_token: Option<String>,
        concurrency: usize,
    ) -> Self {
        Self::with_fetcher(output_directory, bearer_token, concurrency, Arc::new(HttpFetcher::new()))
    }

    /// Create a scheduler with the default transport and the default
    /// concurrency of
    /// [`DEFAULT_CONCURRENCY`](crate::config::DEFAULT_CONCURRENCY) slots.
    pub fn with_defaults(output_directory: impl Into<PathBuf>, bearer_token: Option<String>) -> Self {
        Self::new(output_directory, bearer_token, crate::config::DEFAULT_CONCURRENCY)
    }

    /// Create a scheduler with a custom transport.
    pub fn with_fetcher(
        output_directory: impl Into<PathBuf>,
        bearer_token: Option<String>,
        concurrency: usize,
        fetcher: Arc<dyn FileFetcher>,
    ) -> Self {
        assert!(concurrency > 0, "concurrency must be non-zero");

        Self {
            output_directory: output_directory.into(),
            bearer_token,
            concurrency,
            fetcher,
            running: Vec::new(),
            waiting: VecDeque::new(),
            pending_failures: Vec::new(),
        }
    }

    /// Number of currently running tasks.
    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    /// Number of tasks waiting for a free slot.
    pub fn waiting_count(&self) -> usize {
        self.waiting.len()
    }

    /// Whether a destination key already exists under the output directory.
    pub fn exists(&self, filename: &str) -> bool {
        self.output_directory.join(filename).exists()
    }

    /// Accept a task without blocking.
    ///
    /// Starts it immediately when a slot is free, otherwise appends it to the
    /// waiting queue. The destination is not inspected here; existence
    /// checking happens when the task actually runs.
    pub fn enqueue(&mut self, task: DownloadTask) {
        if self.running.len() >= self.concurrency {
            debug!(url = %task.url, waiting = self.waiting.len() + 1, "queueing download");
            self.waiting.push_back(task);
        } else {
            self.spawn_task(task);
        }
    }

    /// Block until the running set and the waiting queue are both empty.
    ///
    /// Repeatedly waits for at least one running task to finish, reaps every
    /// finished task, then admits queued tasks up to the free slot count. One
    /// task's failure never stops its siblings.
    ///
    /// # Errors
    /// After draining, if any task failed, returns an [`AggregateError`]
    /// carrying every individual failure. The failure list is cleared, so a
    /// subsequent flush starts clean.
    pub async fn flush(&mut self) -> Result<(), AggregateError> {
        while !self.running.is_empty() || !self.waiting.is_empty() {
            self.wait_for_one().await;
            self.reap_finished().await;
            self.admit_waiting();
        }

        if self.pending_failures.is_empty() {
            Ok(())
        } else {
            let errors = std::mem::take(&mut self.pending_failures);
            warn!(failed = errors.len(), "flush completed with failures");
            Err(AggregateError { errors })
        }
    }

    /// Flush, then release the underlying transport.
    pub async fn close(mut self) -> Result<(), AggregateError> {
        self.flush().await
    }

    /// Serialize `content` as JSON to a destination key, creating parent
    /// directories as needed.
    pub fn write_json<T: Serialize>(&self, filename: &str, content: &T) -> Result<(), DownloadError> {
        let destination = self.output_directory.join(filename);
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_vec(content)?;
        std::fs::write(&destination, data)?;

        Ok(())
    }

    fn spawn_task(&mut self, task: DownloadTask) {
        let url = task.url.clone();
        let fetcher = Arc::clone(&self.fetcher);
        let output_directory = self.output_directory.clone();
        let bearer_token = self.bearer_token.clone();

        debug!(url = %url, running = self.running.len() + 1, "starting download");

        let handle = tokio::spawn(execute(fetcher, output_directory, bearer_token, task));
        self.running.push((url, handle));
    }

    /// Wait until at least one running task completes and record its outcome.
    async fn wait_for_one(&mut self) {
        if self.running.is_empty() {
            return;
        }

        let (mut urls, handles): (Vec<_>, Vec<_>) = self.running.drain(..).unzip();
        let (result, index, remaining) = future::select_all(handles).await;

        // select_all swap-removes the completed future; mirror that here so
        // URLs stay paired with their handles
        let url = urls.swap_remove(index);
        self.record_outcome(url, result);

        self.running = urls.into_iter().zip(remaining).collect();
    }

    /// Reap every already-finished task without blocking on the rest.
    async fn reap_finished(&mut self) {
        let mut index = 0;
        while index < self.running.len() {
            if self.running[index].1.is_finished() {
                let (url, handle) = self.running.swap_remove(index);
                let result = handle.await;
                self.record_outcome(url, result);
            } else {
                index += 1;
            }
        }
    }

    /// Admit waiting tasks into free slots, FIFO.
    fn admit_waiting(&mut self) {
        while self.running.len() < self.concurrency {
            match self.waiting.pop_front() {
                Some(task) => self.spawn_task(task),
                None => break,
            }
        }
    }

    fn record_outcome(&mut self, url: String, result: Result<Result<TaskOutcome, DownloadError>, JoinError>) {
        match result {
            Ok(Ok(outcome)) => {
                debug!(url = %url, ?outcome, "download finished");
            }
            Ok(Err(cause)) => {
                warn!(url = %url, %cause, "download failed");
                self.pending_failures.push(FileDownloadError { url, cause });
            }
            Err(join_err) => {
                let cause = DownloadError::TaskFailed(join_err.to_string());
                warn!(url = %url, %cause, "download task aborted");
                self.pending_failures.push(FileDownloadError { url, cause });
            }
        }
    }
}

/// Execute one task to a terminal state.
///
/// Task bodies never touch the scheduler's queues; admission of waiting work
/// is handled solely by the flush loop.
async fn execute(
    fetcher: Arc<dyn FileFetcher>,
    output_directory: PathBuf,
    bearer_token: Option<String>,
    task: DownloadTask,
) -> Result<TaskOutcome, DownloadError> {
    let destination = output_directory.join(&task.filename);

    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    if destination.exists() && !task.overwrite {
        debug!(filename = %task.filename, "destination exists, skipping download");
        return Ok(TaskOutcome::SkippedExisting);
    }

    let token = if task.use_auth {
        bearer_token.as_deref()
    } else {
        None
    };

    let fetched = fetcher.fetch(&task.url, token).await?;

    if task.fail_on_error_status && !fetched.is_success() {
        return Err(DownloadError::ErrorStatus {
            url: task.url,
            status: fetched.status,
        });
    }

    tokio::fs::write(&destination, &fetched.content).await?;

    Ok(TaskOutcome::Downloaded)
}
