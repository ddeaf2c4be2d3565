//! Default tuning constants for export runs

use std::time::Duration;

/// Default number of records per fragment file.
/// 5,000 records keeps individual fragment files small enough to load and
/// rewrite quickly while bounding how much of a long history sits in memory.
pub const DEFAULT_FRAGMENT_SIZE: usize = 5000;

/// Default number of simultaneously running download tasks.
/// 10 in-flight fetches saturates most connections without tripping the
/// remote file host's own throttling.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Default maximum number of retries for rate-limited API calls.
/// 5 retries with additive backoff rides out normal throttling windows while
/// still bounding the worst-case wait for a single page.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Interval between background commits of dirty fragments.
/// 15 minutes bounds how much appended history a crash can lose without
/// rewriting fragment files on every append burst.
pub const COMMIT_INTERVAL: Duration = Duration::from_secs(900);
