//! Periodic directory scan that fans new files out to watchers.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

use super::cache::{FileCache, MemoryCache};
use super::forager::Forager;
use super::stats::{ScanStats, ScanStatsSnapshot};
use super::watch::{wait_until_settled, WatchOutcome};
use crate::error::ScanError;
use crate::{Error, Result};

/// How long a file must stop changing before it is foraged.
pub const DEFAULT_INACTIVITY_CUTOFF: Duration = Duration::from_secs(5);

/// Delay between directory scan passes.
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(1);

/// Delay between metadata reads of a watched file.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Builder for [`Scanner`].
#[derive(Default)]
pub struct ScannerBuilder {
    forager: Option<Arc<dyn Forager>>,
    cache: Option<Arc<dyn FileCache>>,
    inactivity_cutoff: Option<Duration>,
    scan_interval: Option<Duration>,
    poll_interval: Option<Duration>,
}

impl ScannerBuilder {
    /// Set the callback that receives settled files. Required.
    #[must_use]
    pub fn forager(mut self, forager: impl Forager) -> Self {
        self.forager = Some(Arc::new(forager));
        self
    }

    /// Set the dedup cache. Defaults to an unbounded [`MemoryCache`].
    #[must_use]
    pub fn cache(mut self, cache: impl FileCache + 'static) -> Self {
        self.cache = Some(Arc::new(cache));
        self
    }

    /// Set the inactivity cutoff. A zero cutoff falls back to the default.
    #[must_use]
    pub fn inactivity_cutoff(mut self, cutoff: Duration) -> Self {
        self.inactivity_cutoff = Some(cutoff);
        self
    }

    /// Set the delay between scan passes.
    #[must_use]
    pub fn scan_interval(mut self, interval: Duration) -> Self {
        self.scan_interval = Some(interval);
        self
    }

    /// Set the delay between metadata reads of a watched file.
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Build the scanner.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no forager was set or an interval
    /// is zero.
    pub fn build(self) -> Result<Scanner> {
        let forager = self
            .forager
            .ok_or_else(|| Error::config("forager is required"))?;

        let scan_interval = self.scan_interval.unwrap_or(DEFAULT_SCAN_INTERVAL);
        if scan_interval.is_zero() {
            return Err(Error::config("scan interval cannot be 0"));
        }

        let poll_interval = self.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL);
        if poll_interval.is_zero() {
            return Err(Error::config("poll interval cannot be 0"));
        }

        let inactivity_cutoff = self
            .inactivity_cutoff
            .filter(|cutoff| !cutoff.is_zero())
            .unwrap_or(DEFAULT_INACTIVITY_CUTOFF);

        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(MemoryCache::new()));

        Ok(Scanner {
            forager,
            cache,
            inactivity_cutoff,
            scan_interval,
            poll_interval,
            dispatch_lock: Mutex::new(()),
            tracker: TaskTracker::new(),
            stats: Arc::new(ScanStats::new()),
        })
    }
}

/// Scans a directory and forages every new file once it settles.
///
/// Each newly discovered path gets its own watcher task. The scan loop
/// never waits on watchers, so a slow file or a slow forager cannot hold
/// up discovery.
pub struct Scanner {
    forager: Arc<dyn Forager>,
    cache: Arc<dyn FileCache>,
    inactivity_cutoff: Duration,
    scan_interval: Duration,
    poll_interval: Duration,
    /// Serializes the cache lookup and insert so that concurrent scans
    /// sharing this scanner dispatch each path once.
    dispatch_lock: Mutex<()>,
    tracker: TaskTracker,
    stats: Arc<ScanStats>,
}

impl Scanner {
    /// Start building a scanner.
    #[must_use]
    pub fn builder() -> ScannerBuilder {
        ScannerBuilder::default()
    }

    /// Scan `scan_dir` every scan interval until cancelled or a fatal error.
    ///
    /// Only immediate entries are considered; sub-directories are skipped.
    /// A path is added to the cache before its watcher is spawned. Passing
    /// `None` for the token means the scan is never cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] once the token fires, a scan error if the
    /// directory cannot be listed, or a cache error if the cache fails.
    /// Watchers already running are left to finish on their own.
    pub async fn scan_for_files(
        &self,
        token: Option<&CancellationToken>,
        scan_dir: impl AsRef<Path>,
    ) -> Result<()> {
        let token = token.cloned().unwrap_or_default();
        let scan_dir = scan_dir.as_ref();

        tracing::info!(
            path = %scan_dir.display(),
            cutoff_ms = self.inactivity_cutoff.as_millis(),
            scan_interval_ms = self.scan_interval.as_millis(),
            "Starting directory scan"
        );

        while !token.is_cancelled() {
            if let Err(e) = self.scan_pass(scan_dir, &token).await {
                tracing::error!(path = %scan_dir.display(), error = %e, "Directory scan aborted");
                return Err(e);
            }

            tokio::select! {
                biased;
                () = token.cancelled() => break,
                () = tokio::time::sleep(self.scan_interval) => {}
            }
        }

        tracing::info!(path = %scan_dir.display(), "Directory scan cancelled");
        Err(Error::Cancelled)
    }

    /// List `scan_dir` once and spawn a watcher for every unseen file.
    ///
    /// Returns the number of watchers spawned.
    async fn scan_pass(&self, scan_dir: &Path, token: &CancellationToken) -> Result<usize> {
        let mut entries = fs::read_dir(scan_dir)
            .await
            .map_err(|e| ScanError::list_failed(scan_dir, e))?;

        let mut spawned = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ScanError::list_failed(scan_dir, e))?
        {
            let path = entry.path();

            // The entry can vanish between the listing and the type lookup.
            let file_type = match entry.file_type().await {
                Ok(file_type) => file_type,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            if file_type.is_dir() {
                continue;
            }

            if !self.claim(&path)? {
                continue;
            }

            tracing::debug!(path = %path.display(), "Discovered new file");
            self.spawn_watch(path, token.clone());
            spawned += 1;
        }

        self.stats.record_pass();
        Ok(spawned)
    }

    /// Record `path` in the cache unless it is already there.
    ///
    /// Returns `true` if this call added it.
    fn claim(&self, path: &Path) -> Result<bool> {
        let _guard = self.dispatch_lock.lock();
        if self.cache.contains(path)? {
            return Ok(false);
        }
        self.cache.add(path)?;
        Ok(true)
    }

    fn spawn_watch(&self, path: PathBuf, token: CancellationToken) {
        let forager = Arc::clone(&self.forager);
        let stats = Arc::clone(&self.stats);
        let cutoff = self.inactivity_cutoff;
        let poll_interval = self.poll_interval;
        let span = tracing::info_span!("watch", path = %path.display());

        stats.record_watch_started();
        self.tracker.spawn(
            async move {
                let outcome = wait_until_settled(&path, cutoff, poll_interval, &token).await;
                match outcome {
                    WatchOutcome::Settled => {
                        tracing::info!("File settled, foraging");
                        forager.forage(token, path).await;
                    }
                    WatchOutcome::Gone => tracing::debug!("File gone, not foraging"),
                    WatchOutcome::Cancelled => tracing::debug!("Watch cancelled"),
                }
                stats.record_watch_finished(outcome);
            }
            .instrument(span),
        );
    }

    /// Wait for every spawned watcher to finish.
    ///
    /// Meant for shutdown after the scan returned; watchers spawned by a
    /// scan that is still running are waited on too.
    pub async fn wait_for_watchers(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Number of watchers still running.
    #[must_use]
    pub fn active_watches(&self) -> usize {
        self.tracker.len()
    }

    /// Snapshot of this scanner's counters.
    #[must_use]
    pub fn stats(&self) -> ScanStatsSnapshot {
        self.stats.snapshot()
    }

    /// The configured inactivity cutoff.
    #[must_use]
    pub const fn inactivity_cutoff(&self) -> Duration {
        self.inactivity_cutoff
    }

    /// The configured delay between scan passes.
    #[must_use]
    pub const fn scan_interval(&self) -> Duration {
        self.scan_interval
    }

    /// The configured delay between polls of a watched file.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("inactivity_cutoff", &self.inactivity_cutoff)
            .field("scan_interval", &self.scan_interval)
            .field("poll_interval", &self.poll_interval)
            .field("active_watches", &self.tracker.len())
            .finish_non_exhaustive()
    }
}
