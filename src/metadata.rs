//! Export run metadata and incremental window handling
//!
//! One [`ExportMetadata`] record is persisted per run so a future run can
//! resume from the prior export time. The [`ExportWindow`] derived from it
//! bounds a paginated history export: a full export leaves the lower bound
//! open, an incremental export starts where the previous run stopped.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Metadata persisted once per export run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportMetadata {
    /// When the run started, in seconds since the Unix epoch
    pub export_time: i64,
}

/// Metadata errors
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// Filesystem error reading or writing the metadata file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The metadata file exists but does not parse.
    #[error("metadata parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ExportMetadata {
    /// Metadata stamped with the current time.
    pub fn now() -> Self {
        Self {
            export_time: Utc::now().timestamp(),
        }
    }

    /// Read a prior run's metadata. Returns `None` when no metadata file
    /// exists yet (first run).
    ///
    /// # Errors
    /// Returns [`MetadataError::Parse`] if the file exists but is not valid
    /// metadata JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>, MetadataError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no prior export metadata");
            return Ok(None);
        }

        let raw = fs::read(path)?;
        let metadata = serde_json::from_slice(&raw)?;

        Ok(Some(metadata))
    }

    /// Persist this run's metadata, overwriting any prior record.
    pub fn store(&self, path: impl AsRef<Path>) -> Result<(), MetadataError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_vec(self)?;
        fs::write(path, data)?;

        Ok(())
    }
}

/// Time window bounding one paginated history export.
///
/// `latest` is always set (messages after the run started are left for the
/// next run); `oldest` is set only for incremental exports resuming from a
/// prior run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportWindow {
    /// Exclusive lower bound, seconds since the Unix epoch
    pub oldest: Option<i64>,
    /// Inclusive upper bound, seconds since the Unix epoch
    pub latest: i64,
}

impl ExportWindow {
    /// A window covering all history up to `latest`.
    pub fn full(latest: i64) -> Self {
        Self { oldest: None, latest }
    }

    /// Derive the window for a run.
    ///
    /// With `incremental` set and prior metadata present, the window starts
    /// at the prior export time; otherwise it covers all history. Callers
    /// choose the behavior per run rather than the library hard-coding
    /// either.
    pub fn for_run(previous: Option<&ExportMetadata>, latest: i64, incremental: bool) -> Self {
        let oldest = match (incremental, previous) {
            (true, Some(metadata)) => Some(metadata.export_time),
            _ => None,
        };

        Self { oldest, latest }
    }

    /// Whether a timestamp falls inside the window.
    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp <= self.latest && self.oldest.map_or(true, |oldest| timestamp > oldest)
    }
}
