//! Integration tests for the paged sequence wrapper

use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use workspace_exporter::api::{ApiError, Page, PagedSequence, PaginationError, RetryError};

/// Scripted paginated API: pops one response per call and records the cursor
/// each call was made with.
#[derive(Clone)]
struct ScriptedApi {
    responses: Arc<Mutex<VecDeque<Result<Page, ApiError>>>>,
    cursors: Arc<Mutex<Vec<Option<String>>>>,
}

impl ScriptedApi {
    fn new(responses: Vec<Result<Page, ApiError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            cursors: Arc::new(Mutex::new(Vec::new())),
        }
    }

    async fn call(&self, cursor: Option<String>) -> Result<Page, ApiError> {
        self.cursors.lock().unwrap().push(cursor);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("script exhausted")
    }

    fn cursors(&self) -> Vec<Option<String>> {
        self.cursors.lock().unwrap().clone()
    }
}

fn page(n: u64, next_cursor: Option<&str>) -> Page {
    Page::new(json!({ "messages": [n] }), next_cursor.map(str::to_string))
}

#[tokio::test]
async fn test_collects_all_pages_until_cursor_absent() {
    let api = ScriptedApi::new(vec![
        Ok(page(1, Some("c1"))),
        Ok(page(2, Some("c2"))),
        Ok(page(3, None)),
    ]);

    let call = api.clone();
    let mut pages = PagedSequence::new(move |cursor| {
        let call = call.clone();
        async move { call.call(cursor).await }
    }, 3);

    pages.run().await.unwrap();

    let mut payloads = Vec::new();
    while let Some(page) = pages.next_page().await.unwrap() {
        payloads.push(page.payload);
    }

    assert_eq!(
        payloads,
        vec![
            json!({"messages": [1]}),
            json!({"messages": [2]}),
            json!({"messages": [3]})
        ]
    );
    // First fetch has no cursor; later fetches carry the previous page's
    assert_eq!(
        api.cursors(),
        vec![None, Some("c1".to_string()), Some("c2".to_string())]
    );

    // Exhausted sequence keeps returning None
    assert!(pages.next_page().await.unwrap().is_none());
}

#[tokio::test]
async fn test_next_page_before_run_is_rejected() {
    let api = ScriptedApi::new(vec![Ok(page(1, None))]);

    let call = api.clone();
    let mut pages = PagedSequence::new(move |cursor| {
        let call = call.clone();
        async move { call.call(cursor).await }
    }, 3);

    assert!(matches!(
        pages.next_page().await,
        Err(PaginationError::NotStarted)
    ));

    // run() repairs the sequence
    pages.run().await.unwrap();
    assert!(pages.next_page().await.unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_mid_stream_rate_limit_only_delays_next_page() {
    let api = ScriptedApi::new(vec![
        Ok(page(1, Some("c1"))),
        Err(ApiError::RateLimited(Duration::from_secs(5))),
        Ok(page(2, None)),
    ]);

    let call = api.clone();
    let mut pages = PagedSequence::new(move |cursor| {
        let call = call.clone();
        async move { call.call(cursor).await }
    }, 3);

    pages.run().await.unwrap();

    // Page 1 was produced before the throttled fetch and is unaffected
    assert_eq!(pages.next_page().await.unwrap().unwrap().payload, json!({"messages": [1]}));
    assert_eq!(pages.next_page().await.unwrap().unwrap().payload, json!({"messages": [2]}));
    assert!(pages.next_page().await.unwrap().is_none());

    // The retried fetch reused the same cursor
    assert_eq!(
        api.cursors(),
        vec![None, Some("c1".to_string()), Some("c1".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_first_page_retried_in_run() {
    let api = ScriptedApi::new(vec![
        Err(ApiError::RateLimited(Duration::from_secs(1))),
        Ok(page(1, None)),
    ]);

    let call = api.clone();
    let mut pages = PagedSequence::new(move |cursor| {
        let call = call.clone();
        async move { call.call(cursor).await }
    }, 3);

    pages.run().await.unwrap();
    assert!(pages.next_page().await.unwrap().is_some());
    assert_eq!(api.cursors(), vec![None, None]);
}

#[tokio::test(start_paused = true)]
async fn test_exhaustion_surfaces_and_preserves_cursor() {
    let api = ScriptedApi::new(vec![
        Ok(page(1, Some("c1"))),
        Err(ApiError::RateLimited(Duration::from_secs(1))),
        Err(ApiError::RateLimited(Duration::from_secs(1))),
        Err(ApiError::RateLimited(Duration::from_secs(1))),
        Ok(page(2, None)),
    ]);

    let call = api.clone();
    let mut pages = PagedSequence::new(move |cursor| {
        let call = call.clone();
        async move { call.call(cursor).await }
    }, 2);

    pages.run().await.unwrap();
    pages.next_page().await.unwrap();

    // Two retries are not enough for three consecutive rate limits
    assert!(matches!(
        pages.next_page().await,
        Err(PaginationError::Retry(RetryError::Exhausted { attempts: 2 }))
    ));

    // The page is still requestable afterwards, with the same cursor
    let retried = pages.next_page().await.unwrap().unwrap();
    assert_eq!(retried.payload, json!({"messages": [2]}));
    assert_eq!(
        api.cursors(),
        vec![
            None,
            Some("c1".to_string()),
            Some("c1".to_string()),
            Some("c1".to_string()),
            Some("c1".to_string())
        ]
    );
}

#[tokio::test]
async fn test_non_rate_limit_failure_propagates() {
    let api = ScriptedApi::new(vec![Err(ApiError::Api("channel_not_found".to_string()))]);

    let call = api.clone();
    let mut pages = PagedSequence::new(move |cursor| {
        let call = call.clone();
        async move { call.call(cursor).await }
    }, 3);

    assert!(matches!(
        pages.run().await,
        Err(RetryError::Call(ApiError::Api(_)))
    ));
}
