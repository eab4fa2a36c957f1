//! Dedup caches that remember which paths were already dispatched.
//!
//! The scan loop asks [`FileCache::contains`] for every directory entry and
//! calls [`FileCache::add`] before it spawns a watcher, so a path that stays
//! in the cache is foraged at most once.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use parking_lot::Mutex;

use crate::error::CacheError;

/// Membership store for discovered paths.
///
/// Implementations must tolerate concurrent calls from several tasks.
/// Any error returned here aborts the scan that made the call.
pub trait FileCache: Send + Sync {
    /// Whether `path` was already added.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be queried.
    fn contains(&self, path: &Path) -> Result<bool, CacheError>;

    /// Record `path` as known. Adding a known path is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be updated.
    fn add(&self, path: &Path) -> Result<(), CacheError>;
}

impl<T: FileCache + ?Sized> FileCache for Arc<T> {
    fn contains(&self, path: &Path) -> Result<bool, CacheError> {
        (**self).contains(path)
    }

    fn add(&self, path: &Path) -> Result<(), CacheError> {
        (**self).add(path)
    }
}

/// Unbounded in-memory cache, the scanner default.
///
/// Never evicts, so memory grows with every distinct path seen for the
/// lifetime of the process. Safe for concurrent use; every call takes a
/// short `parking_lot` lock.
#[derive(Debug, Default)]
pub struct MemoryCache {
    paths: Mutex<HashSet<PathBuf>>,
}

impl MemoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of remembered paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.lock().len()
    }

    /// Whether no path has been remembered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.lock().is_empty()
    }
}

impl FileCache for MemoryCache {
    fn contains(&self, path: &Path) -> Result<bool, CacheError> {
        Ok(self.paths.lock().contains(path))
    }

    fn add(&self, path: &Path) -> Result<(), CacheError> {
        self.paths.lock().insert(path.to_path_buf());
        Ok(())
    }
}

/// In-memory cache with explicit eviction.
///
/// Entries are dropped once `capacity` is exceeded or after `ttl`,
/// whichever is configured. An evicted path that is still on disk is
/// discovered again on the next scan pass and foraged a second time.
pub struct BoundedCache {
    cache: Cache<PathBuf, ()>,
    capacity: Option<u64>,
    ttl: Option<Duration>,
}

impl BoundedCache {
    /// Create a cache bounded by entry count and/or entry age.
    ///
    /// # Errors
    ///
    /// Returns an error if neither bound is set, or a bound is zero.
    pub fn new(capacity: Option<u64>, ttl: Option<Duration>) -> crate::Result<Self> {
        if capacity.is_none() && ttl.is_none() {
            return Err(crate::Error::config(
                "bounded cache needs a capacity or a ttl",
            ));
        }
        if capacity == Some(0) {
            return Err(crate::Error::config("cache capacity cannot be 0"));
        }
        if ttl.is_some_and(|t| t.is_zero()) {
            return Err(crate::Error::config("cache ttl cannot be 0"));
        }

        let mut builder = Cache::builder();
        if let Some(capacity) = capacity {
            builder = builder.max_capacity(capacity);
        }
        if let Some(ttl) = ttl {
            builder = builder.time_to_live(ttl);
        }

        Ok(Self {
            cache: builder.build(),
            capacity,
            ttl,
        })
    }

    /// Maximum number of entries, if bounded by count.
    #[must_use]
    pub const fn capacity(&self) -> Option<u64> {
        self.capacity
    }

    /// Entry lifetime, if bounded by age.
    #[must_use]
    pub const fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Approximate number of live entries after pending evictions run.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

impl std::fmt::Debug for BoundedCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedCache")
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

impl FileCache for BoundedCache {
    fn contains(&self, path: &Path) -> Result<bool, CacheError> {
        Ok(self.cache.contains_key(path))
    }

    fn add(&self, path: &Path) -> Result<(), CacheError> {
        self.cache.insert(path.to_path_buf(), ());
        Ok(())
    }
}
