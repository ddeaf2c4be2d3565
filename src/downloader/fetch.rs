//! File fetch transport
//!
//! The scheduler talks to the network through [`FileFetcher`], so tests can
//! substitute an in-memory transport and the HTTP client stays in one place.

use super::DownloadError;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;

/// Raw result of fetching one URL: status code plus body bytes.
#[derive(Debug, Clone)]
pub struct FetchedFile {
    /// HTTP status code of the response
    pub status: u16,
    /// Response body
    pub content: Bytes,
}

impl FetchedFile {
    /// Whether the status code is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport for fetching a URL with an optional bearer token.
#[async_trait]
pub trait FileFetcher: Send + Sync {
    /// Fetch `url`, attaching `bearer_token` as an `Authorization` header
    /// when present. Non-success statuses are returned, not raised; the
    /// caller decides whether they fail the task.
    async fn fetch(&self, url: &str, bearer_token: Option<&str>) -> Result<FetchedFile, DownloadError>;
}

/// `reqwest`-backed fetcher shared by all download tasks.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher with a fresh HTTP client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fetcher reusing an existing HTTP client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FileFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, bearer_token: Option<&str>) -> Result<FetchedFile, DownloadError> {
        let mut request = self.client.get(url);
        if let Some(token) = bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|err| DownloadError::Network(err.to_string()))?;

        let status = response.status().as_u16();
        let content = response
            .bytes()
            .await
            .map_err(|err| DownloadError::Network(err.to_string()))?;

        Ok(FetchedFile { status, content })
    }
}
