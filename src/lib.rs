//! # Workspace Exporter Library
//!
//! Reusable primitives for exporting workspace data from a paginated,
//! rate-limited remote API: chunked on-disk JSON storage, bounded-concurrency
//! file downloads, and retry-aware pagination.
//!
//! ## Features
//!
//! - **Fragmented Storage**: Build unbounded ordered record collections on
//!   disk without holding them fully in memory, with random access, slicing,
//!   and partial commit
//! - **Bounded Downloads**: Dispatch many file fetches against a fixed number
//!   of in-flight slots, aggregating partial failures without aborting the batch
//! - **Rate-Limit Handling**: Absorb transient throttling with bounded additive
//!   backoff around each page of a paginated call
//! - **Resume Capability**: Idempotent downloads and per-run export metadata
//!   let interrupted runs pick up where they left off
//!
//! ## Quick Start
//!
//! ```no_run
//! use workspace_exporter::downloader::{DownloadScheduler, DownloadTask};
//! use workspace_exporter::fragment::FragmentStore;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Accumulate records into a fragmented on-disk store
//! let mut store = FragmentStore::open("./export/history", 5000)?;
//! store.append(json!({"ts": "1700000000.000100", "text": "hello"}))?;
//! store.commit()?;
//!
//! // Download referenced files with at most 10 in flight
//! let mut scheduler = DownloadScheduler::new("./export/files", None, 10);
//! scheduler.enqueue(DownloadTask::new("F123/avatar.png", "https://example.com/avatar.png"));
//! scheduler.flush().await?;
//! scheduler.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several core modules:
//!
//! - [`fragment`] - Chunked, lazily-loaded, disk-persisted record sequences
//! - [`downloader`] - Bounded-concurrency download scheduling
//! - [`api`] - Retry and pagination wrappers for rate-limited remote calls
//! - [`metadata`] - Per-run export metadata and incremental export windows
//! - [`config`] - Default tuning constants
//!
//! ## Error Handling
//!
//! Each module defines its own error enum. Failures that threaten structural
//! invariants (corrupted fragment files, out-of-range indices) abort the
//! calling operation; individual download failures are collected and surfaced
//! once per flush as a [`downloader::AggregateError`].

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Retry and pagination wrappers for rate-limited remote calls
pub mod api;

/// Default tuning constants
pub mod config;

/// Bounded-concurrency download scheduling
pub mod downloader;

/// Fragmented on-disk JSON record storage
pub mod fragment;

/// Export run metadata and incremental window handling
pub mod metadata;

// Re-export commonly used types
pub use api::{with_retry, Page, PagedSequence, RateLimitSignal};
pub use downloader::{DownloadScheduler, DownloadTask};
pub use fragment::FragmentStore;
pub use metadata::{ExportMetadata, ExportWindow};
