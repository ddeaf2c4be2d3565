//! Background periodic commit of dirty fragments
//!
//! A [`CommitTimer`] commits a [`SharedFragmentStore`] at a fixed interval
//! so long append bursts between explicit commits survive a crash up to one
//! interval of loss. The timer is an explicitly cancellable task with a
//! shutdown handshake: [`CommitTimer::shutdown`] requests termination and
//! waits for the task to finish, so no commit is cut off mid-write.

use super::SharedFragmentStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Termination request shared between the timer task and its handle.
#[derive(Debug, Default)]
struct StopSignal {
    requested: AtomicBool,
    notify: Notify,
}

impl StopSignal {
    fn request(&self) {
        if !self.requested.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        if self.is_requested() {
            return;
        }
        self.notify.notified().await;
    }
}

/// Periodically commits a shared fragment store until shut down.
#[derive(Debug)]
pub struct CommitTimer {
    stop: Arc<StopSignal>,
    handle: JoinHandle<()>,
}

impl CommitTimer {
    /// Spawn the background commit task.
    ///
    /// Every `interval`, the task takes the store mutex and commits all dirty
    /// fragments. Foreground mutation through the same
    /// [`SharedFragmentStore`] serializes against the commit, so a commit
    /// never observes a half-applied extend.
    pub fn spawn(store: SharedFragmentStore, interval: Duration) -> Self {
        let stop = Arc::new(StopSignal::default());
        let task_stop = Arc::clone(&stop);

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = sleep(interval) => {
                        let mut store = store.lock().await;
                        if let Err(err) = store.commit() {
                            warn!(%err, "periodic fragment commit failed");
                        }
                    }
                    _ = task_stop.wait() => {
                        debug!("commit timer stopping");
                        break;
                    }
                }
            }
        });

        Self { stop, handle }
    }

    /// Spawn with the default interval of
    /// [`COMMIT_INTERVAL`](crate::config::COMMIT_INTERVAL).
    pub fn spawn_default(store: SharedFragmentStore) -> Self {
        Self::spawn(store, crate::config::COMMIT_INTERVAL)
    }

    /// Request termination and wait for the task to exit.
    ///
    /// Does not perform a final commit; the store owner is expected to
    /// [`close`](super::FragmentStore::close) the store afterwards.
    pub async fn shutdown(self) {
        self.stop.request();
        if let Err(err) = self.handle.await {
            warn!(%err, "commit timer task did not shut down cleanly");
        }
    }
}
