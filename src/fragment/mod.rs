//! Fragmented on-disk JSON record storage
//!
//! A [`FragmentStore`] persists one ordered sequence of JSON records as a
//! directory of fixed-capacity fragment files (`0.json`, `1.json`, ...).
//! Fragments are loaded lazily on first access and written back only when
//! dirty, so an export run can append an unbounded history while keeping a
//! bounded working set in memory.
//!
//! # Overview
//!
//! 1. **Open**: [`FragmentStore::open`] discovers existing fragment files by
//!    probing sequential indices, or self-initializes an empty fragment 0
//! 2. **Mutate**: [`FragmentStore::append`], [`FragmentStore::extend`] and
//!    [`FragmentStore::update`] mark the touched fragments dirty
//! 3. **Read**: [`FragmentStore::get`] and [`FragmentStore::slice`] support
//!    negative indices and Python-style slice semantics
//! 4. **Persist**: [`FragmentStore::commit`] rewrites every dirty fragment;
//!    [`CommitTimer`] can do this periodically in the background
//!
//! # Durability
//!
//! Committing a fragment is a full overwrite of its backing file, not an
//! append. A crash mid-commit can leave other, not-yet-written dirty
//! fragments representing an older on-disk state; durability is
//! fragment-granular, never record-granular.

use std::path::PathBuf;

pub mod commit_timer;
pub mod slice;
pub mod store;

pub use commit_timer::CommitTimer;
pub use slice::SliceBounds;
pub use store::{split_json_file, FragmentStore, SharedFragmentStore};

/// Fragment storage errors
#[derive(Debug, thiserror::Error)]
pub enum FragmentError {
    /// A fragment file expected by the index map is missing or unparsable.
    /// On-disk state must be fixed out of band; this is never retried.
    #[error("storage corruption in {path}: {reason}")]
    StorageCorruption {
        /// Backing file of the affected fragment
        path: PathBuf,
        /// What failed when loading it
        reason: String,
    },

    /// A normalized access index fell outside `[0, len)`.
    #[error("index {index} out of range for store of length {len}")]
    IndexOutOfRange {
        /// The index as supplied by the caller
        index: i64,
        /// Record count of the store at the time of the access
        len: usize,
    },

    /// Slice step of zero.
    #[error("slice step cannot be zero")]
    ZeroStep,

    /// The store was closed and can no longer be used.
    #[error("fragment store is closed")]
    Closed,

    /// Filesystem error while committing or probing fragments.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error while committing a fragment.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for fragment storage operations
pub type FragmentResult<T> = Result<T, FragmentError>;
