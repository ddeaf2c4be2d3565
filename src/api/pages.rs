//! Restartable lazy sequence of pages from a paginated call

use super::retry::{with_retry, RetryError};
use super::RateLimitSignal;
use serde_json::Value;
use std::future::Future;
use tracing::debug;

/// One page of results from a paginated call.
///
/// The payload is opaque to the pagination machinery; it is forwarded to the
/// caller as-is. The sequence ends when a page carries no continuation
/// cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Raw page payload
    pub payload: Value,
    /// Opaque marker for the next page, absent on the last page
    pub next_cursor: Option<String>,
}

impl Page {
    /// Create a page.
    pub fn new(payload: Value, next_cursor: Option<String>) -> Self {
        Self { payload, next_cursor }
    }
}

/// Why a page could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum PaginationError<E: std::error::Error> {
    /// [`PagedSequence::run`] must complete before pages are requested.
    #[error("run() must complete before pages can be consumed")]
    NotStarted,

    /// The underlying page fetch failed, possibly after retries.
    #[error(transparent)]
    Retry(#[from] RetryError<E>),
}

enum State {
    NotStarted,
    Buffered(Page),
    HasCursor(String),
    Done,
}

/// A paginated, rate-limited remote call as a restartable lazy sequence of
/// pages.
///
/// The fetch closure receives the continuation cursor of the previous page
/// (`None` for the first page). [`run`](PagedSequence::run) performs the
/// first fetch and must complete before iteration; each
/// [`next_page`](PagedSequence::next_page) wraps only the next fetch in
/// [`with_retry`], so a mid-stream rate limit delays the next page without
/// touching pages already produced.
///
/// ```no_run
/// # use workspace_exporter::api::{ApiError, Page, PagedSequence};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut pages = PagedSequence::new(
///     |cursor: Option<String>| async move {
///         // one remote call per page
///         # let _ = cursor;
///         Ok::<_, ApiError>(Page::new(serde_json::json!({"messages": []}), None))
///     },
///     5,
/// );
///
/// pages.run().await?;
/// while let Some(page) = pages.next_page().await? {
///     // forward page.payload to the caller
/// }
/// # Ok(())
/// # }
/// ```
pub struct PagedSequence<F> {
    fetch: F,
    max_retries: u32,
    state: State,
}

impl<F, Fut, E> PagedSequence<F>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page, E>>,
    E: RateLimitSignal + std::error::Error,
{
    /// Wrap a page-fetch closure. Nothing is fetched until
    /// [`run`](PagedSequence::run).
    pub fn new(fetch: F, max_retries: u32) -> Self {
        Self {
            fetch,
            max_retries,
            state: State::NotStarted,
        }
    }

    /// Wrap a page-fetch closure with the default retry budget of
    /// [`DEFAULT_MAX_RETRIES`](crate::config::DEFAULT_MAX_RETRIES).
    pub fn with_default_retries(fetch: F) -> Self {
        Self::new(fetch, crate::config::DEFAULT_MAX_RETRIES)
    }

    /// Fetch the first page, retrying rate limits.
    ///
    /// # Errors
    /// Returns [`RetryError`] if the first fetch fails or exhausts its
    /// retries.
    pub async fn run(&mut self) -> Result<(), RetryError<E>> {
        let max_retries = self.max_retries;
        let fetch = &mut self.fetch;

        let page = with_retry(|| fetch(None), max_retries).await?;
        debug!(has_cursor = page.next_cursor.is_some(), "fetched first page");

        self.state = State::Buffered(page);
        Ok(())
    }

    /// Produce the next page, or `None` once a page without a continuation
    /// cursor has been returned.
    ///
    /// # Errors
    /// Returns [`PaginationError::NotStarted`] if [`run`](PagedSequence::run)
    /// has not completed, or the retry failure of the underlying fetch.
    pub async fn next_page(&mut self) -> Result<Option<Page>, PaginationError<E>> {
        match std::mem::replace(&mut self.state, State::Done) {
            State::NotStarted => {
                self.state = State::NotStarted;
                Err(PaginationError::NotStarted)
            }
            State::Buffered(page) => {
                self.advance(&page);
                Ok(Some(page))
            }
            State::HasCursor(cursor) => {
                let max_retries = self.max_retries;
                let fetch = &mut self.fetch;

                let page = match with_retry(|| fetch(Some(cursor.clone())), max_retries).await {
                    Ok(page) => page,
                    Err(err) => {
                        // Keep the cursor so the same page can be re-requested
                        self.state = State::HasCursor(cursor);
                        return Err(err.into());
                    }
                };
                debug!(has_cursor = page.next_cursor.is_some(), "fetched next page");

                self.advance(&page);
                Ok(Some(page))
            }
            State::Done => Ok(None),
        }
    }

    fn advance(&mut self, page: &Page) {
        self.state = match &page.next_cursor {
            Some(cursor) => State::HasCursor(cursor.clone()),
            None => State::Done,
        };
    }
}
