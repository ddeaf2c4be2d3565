//! Chunked persistent record sequence
//!
//! One [`FragmentStore`] owns one directory of fragment files. Every
//! fragment except possibly the last holds exactly `fragment_size` records;
//! fragment indices are contiguous starting at 0 with no gaps. Records are
//! opaque [`serde_json::Value`]s; the store never interprets their contents.

use super::slice::SliceBounds;
use super::{FragmentError, FragmentResult};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// A fragment store behind a mutex, shareable with a background
/// [`CommitTimer`](super::CommitTimer).
pub type SharedFragmentStore = Arc<Mutex<FragmentStore>>;

/// One loaded chunk of the record sequence.
#[derive(Debug)]
struct Fragment {
    records: Vec<Value>,
}

/// Chunked, lazily-loaded, disk-persisted ordered sequence of JSON records.
///
/// Global element index `i` lives at offset `i % fragment_size` of fragment
/// `i / fragment_size`. Fragments are loaded on demand and cached until
/// [`close`](FragmentStore::close); mutations mark the touched fragments
/// dirty, and [`commit`](FragmentStore::commit) writes dirty fragments back.
#[derive(Debug)]
pub struct FragmentStore {
    directory: PathBuf,
    fragment_size: usize,
    fragment_count: usize,
    file_map: BTreeMap<usize, PathBuf>,
    loaded: BTreeMap<usize, Fragment>,
    dirty: BTreeSet<usize>,
    closed: bool,
}

impl FragmentStore {
    /// Open a fragment directory, creating it if needed.
    ///
    /// Discovers existing fragments by probing sequential filenames
    /// (`0.json`, `1.json`, ...) until the first missing index. A directory
    /// with no fragments self-initializes with an empty, dirty fragment 0.
    ///
    /// Probing checks file existence only; unreadable or non-array fragment
    /// content surfaces as [`FragmentError::StorageCorruption`] when the
    /// fragment is first loaded, so opening a large history stays cheap.
    ///
    /// `fragment_size` is fixed for the lifetime of the directory and must
    /// match the size the store was first created with; it must be non-zero.
    ///
    /// # Errors
    /// Returns [`FragmentError::Io`] if the directory cannot be created.
    pub fn open(directory: impl AsRef<Path>, fragment_size: usize) -> FragmentResult<Self> {
        assert!(fragment_size > 0, "fragment_size must be non-zero");

        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory)?;

        let mut store = Self {
            directory,
            fragment_size,
            fragment_count: 0,
            file_map: BTreeMap::new(),
            loaded: BTreeMap::new(),
            dirty: BTreeSet::new(),
            closed: false,
        };

        store.load_file_map();

        if store.fragment_count == 0 {
            store.create_new_fragment();
        }

        debug!(
            directory = %store.directory.display(),
            fragments = store.fragment_count,
            "opened fragment store"
        );

        Ok(store)
    }

    /// Open with the default fragment size of
    /// [`DEFAULT_FRAGMENT_SIZE`](crate::config::DEFAULT_FRAGMENT_SIZE) records.
    pub fn open_default(directory: impl AsRef<Path>) -> FragmentResult<Self> {
        Self::open(directory, crate::config::DEFAULT_FRAGMENT_SIZE)
    }

    /// Wrap the store for sharing with a background commit task.
    pub fn into_shared(self) -> SharedFragmentStore {
        Arc::new(Mutex::new(self))
    }

    /// The directory backing this store.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Number of records per full fragment.
    pub fn fragment_size(&self) -> usize {
        self.fragment_size
    }

    /// Number of fragments, loaded or not.
    pub fn fragment_count(&self) -> usize {
        self.fragment_count
    }

    /// Indices of fragments with unwritten in-memory changes.
    pub fn dirty_fragments(&self) -> Vec<usize> {
        self.dirty.iter().copied().collect()
    }

    /// Total record count.
    ///
    /// Requires the size of the last fragment, which is loaded on first call
    /// and cached afterwards.
    pub fn len(&mut self) -> FragmentResult<usize> {
        self.ensure_open()?;
        let last = self.fragment_count - 1;
        self.load_fragment(last)?;
        Ok(last * self.fragment_size + self.loaded[&last].records.len())
    }

    /// Whether the store holds no records.
    pub fn is_empty(&mut self) -> FragmentResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Record at global index `index`.
    ///
    /// Negative indices count from the end, Python style: `get(-1)` is the
    /// last record. The owning fragment is loaded on demand.
    ///
    /// # Errors
    /// Returns [`FragmentError::IndexOutOfRange`] if the normalized index
    /// falls outside `[0, len)`.
    pub fn get(&mut self, index: i64) -> FragmentResult<Value> {
        let index = self.normalize_index(index)?;
        self.record_at(index)
    }

    /// Materialized sub-sequence following Python slice semantics.
    ///
    /// `None` bounds are open-ended, negative bounds count from the end, and
    /// a negative `step` walks the selection in reverse. Only fragments whose
    /// ranges intersect the selected indices are loaded.
    ///
    /// # Errors
    /// Returns [`FragmentError::ZeroStep`] when `step == 0`.
    pub fn slice(
        &mut self,
        start: Option<i64>,
        stop: Option<i64>,
        step: i64,
    ) -> FragmentResult<Vec<Value>> {
        let len = self.len()?;
        let bounds = SliceBounds::normalize(start, stop, step, len)?;

        let mut records = Vec::with_capacity(bounds.len());
        for index in bounds.indices() {
            records.push(self.record_at(index)?);
        }

        Ok(records)
    }

    /// Append one record to the end of the sequence.
    pub fn append(&mut self, value: Value) -> FragmentResult<()> {
        self.extend(vec![value])
    }

    /// Append many records, preserving their relative order.
    ///
    /// Fills the current last fragment up to `fragment_size`, then keeps
    /// creating fresh fragments until every value is placed. The loop is
    /// iterative, so arbitrarily large batches cannot overflow the stack.
    /// Touched fragments are marked dirty. No-op on empty input.
    pub fn extend(&mut self, values: Vec<Value>) -> FragmentResult<()> {
        self.ensure_open()?;

        if values.is_empty() {
            return Ok(());
        }

        let total = values.len();
        let mut remaining = total;
        let mut pending = values.into_iter();

        while remaining > 0 {
            let last = self.fragment_count - 1;
            self.load_fragment(last)?;

            let fragment = self
                .loaded
                .get_mut(&last)
                .expect("last fragment loaded above");
            let room = self.fragment_size - fragment.records.len();

            if room == 0 {
                // Last fragment was already full on disk
                self.create_new_fragment();
                continue;
            }

            let take = room.min(remaining);
            fragment.records.extend(pending.by_ref().take(take));
            remaining -= take;
            self.dirty.insert(last);

            if remaining > 0 {
                self.create_new_fragment();
            }
        }

        debug!(records = total, fragments = self.fragment_count, "extended fragment store");

        Ok(())
    }

    /// Replace the record at global index `index` in place.
    ///
    /// Supports negative indices under the same rule as
    /// [`get`](FragmentStore::get); marks the owning fragment dirty.
    ///
    /// # Errors
    /// Returns [`FragmentError::IndexOutOfRange`] if the normalized index
    /// falls outside `[0, len)`.
    pub fn update(&mut self, index: i64, value: Value) -> FragmentResult<()> {
        let index = self.normalize_index(index)?;
        let (fragment_index, offset) = self.locate(index);

        self.load_fragment(fragment_index)?;
        let fragment = self
            .loaded
            .get_mut(&fragment_index)
            .expect("fragment loaded above");
        fragment.records[offset] = value;

        self.dirty.insert(fragment_index);

        Ok(())
    }

    /// Write every dirty fragment's full record list to its backing file,
    /// then clear the dirty set.
    ///
    /// Each write is a full overwrite of the fragment file. A crash mid-commit
    /// can leave fragments committed earlier in the pass newer on disk than
    /// the ones not yet reached.
    pub fn commit(&mut self) -> FragmentResult<()> {
        self.ensure_open()?;

        let dirty = std::mem::take(&mut self.dirty);
        for &fragment_index in &dirty {
            if let Err(err) = self.write_fragment(fragment_index) {
                // Keep the unwritten fragments dirty for a later retry
                self.dirty.extend(dirty.range(fragment_index..).copied());
                return Err(err);
            }
        }

        if !dirty.is_empty() {
            debug!(fragments = dirty.len(), "committed dirty fragments");
        }

        Ok(())
    }

    /// Commit, then release all in-memory state. The store rejects any
    /// further operation with [`FragmentError::Closed`].
    pub fn close(&mut self) -> FragmentResult<()> {
        if self.closed {
            return Ok(());
        }

        self.commit()?;

        self.file_map.clear();
        self.loaded.clear();
        self.dirty.clear();
        self.closed = true;

        info!(directory = %self.directory.display(), "closed fragment store");

        Ok(())
    }

    /// Iterate over every record in order. Loads all fragments.
    pub fn iter(&mut self) -> FragmentResult<impl Iterator<Item = &Value>> {
        self.ensure_open()?;
        for fragment_index in 0..self.fragment_count {
            self.load_fragment(fragment_index)?;
        }
        Ok(self.loaded.values().flat_map(|f| f.records.iter()))
    }

    fn ensure_open(&self) -> FragmentResult<()> {
        if self.closed {
            Err(FragmentError::Closed)
        } else {
            Ok(())
        }
    }

    fn fragment_path(&self, fragment_index: usize) -> PathBuf {
        self.directory.join(format!("{fragment_index}.json"))
    }

    /// Map a global record index to `(fragment index, offset)`.
    fn locate(&self, index: usize) -> (usize, usize) {
        (index / self.fragment_size, index % self.fragment_size)
    }

    fn normalize_index(&mut self, index: i64) -> FragmentResult<usize> {
        let len = self.len()?;

        let normalized = if index < 0 { index + len as i64 } else { index };
        if normalized < 0 || normalized >= len as i64 {
            return Err(FragmentError::IndexOutOfRange { index, len });
        }

        Ok(normalized as usize)
    }

    fn record_at(&mut self, index: usize) -> FragmentResult<Value> {
        let (fragment_index, offset) = self.locate(index);
        self.load_fragment(fragment_index)?;
        Ok(self.loaded[&fragment_index].records[offset].clone())
    }

    /// Probe sequential fragment filenames until the first missing index.
    fn load_file_map(&mut self) {
        self.fragment_count = 0;
        loop {
            let path = self.fragment_path(self.fragment_count);
            if !path.is_file() {
                break;
            }
            self.file_map.insert(self.fragment_count, path);
            self.fragment_count += 1;
        }
    }

    fn load_fragment(&mut self, fragment_index: usize) -> FragmentResult<()> {
        if self.loaded.contains_key(&fragment_index) {
            return Ok(());
        }

        let path = match self.file_map.get(&fragment_index) {
            Some(path) => path.clone(),
            None => {
                return Err(FragmentError::StorageCorruption {
                    path: self.fragment_path(fragment_index),
                    reason: "fragment missing from file map".to_string(),
                })
            }
        };

        let raw = fs::read(&path).map_err(|err| FragmentError::StorageCorruption {
            path: path.clone(),
            reason: err.to_string(),
        })?;

        let records: Vec<Value> =
            serde_json::from_slice(&raw).map_err(|err| FragmentError::StorageCorruption {
                path: path.clone(),
                reason: format!("not a JSON array: {err}"),
            })?;

        debug!(fragment = fragment_index, records = records.len(), "loaded fragment");

        self.loaded.insert(fragment_index, Fragment { records });

        Ok(())
    }

    /// Add a fresh empty fragment after the current last one. The new
    /// fragment starts dirty so an empty store persists its fragment 0.
    fn create_new_fragment(&mut self) {
        let fragment_index = self.fragment_count;

        self.file_map
            .insert(fragment_index, self.fragment_path(fragment_index));
        self.loaded
            .insert(fragment_index, Fragment { records: Vec::new() });
        self.dirty.insert(fragment_index);

        self.fragment_count += 1;
    }

    fn write_fragment(&self, fragment_index: usize) -> FragmentResult<()> {
        let path = &self.file_map[&fragment_index];
        let fragment = &self.loaded[&fragment_index];

        let data = serde_json::to_vec(&fragment.records)?;
        fs::write(path, data)?;

        Ok(())
    }
}

/// Split one monolithic JSON array file into a fragment directory.
///
/// Reads `data_file`, which must hold a single JSON array, and appends its
/// records to a store opened on `destination` with the given fragment size.
/// Returns the number of records written.
///
/// # Errors
/// Returns [`FragmentError::Serialize`] if the source file is not a JSON
/// array, or any error from the underlying store operations.
pub fn split_json_file(
    data_file: impl AsRef<Path>,
    destination: impl AsRef<Path>,
    fragment_size: usize,
) -> FragmentResult<usize> {
    let raw = fs::read(data_file.as_ref())?;
    let records: Vec<Value> = serde_json::from_slice(&raw)?;
    let count = records.len();

    let mut store = FragmentStore::open(destination, fragment_size)?;
    store.extend(records)?;
    store.close()?;

    Ok(count)
}
