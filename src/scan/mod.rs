//! Polling directory scanner.
//!
//! This module provides:
//! - A scan loop that lists a directory at a fixed interval
//! - Pluggable dedup caches deciding which paths are new
//! - Per-file watchers that wait for a file to stop changing
//! - The forager callback contract for settled files

mod cache;
mod forager;
mod scanner;
mod stats;
mod watch;

pub use cache::{BoundedCache, FileCache, MemoryCache};
pub use forager::Forager;
pub use scanner::{
    Scanner, ScannerBuilder, DEFAULT_INACTIVITY_CUTOFF, DEFAULT_POLL_INTERVAL,
    DEFAULT_SCAN_INTERVAL,
};
pub use stats::{ScanStats, ScanStatsSnapshot};
pub use watch::{file_age, wait_until_settled, WatchOutcome};
