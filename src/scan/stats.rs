//! Per-scanner counters.

use std::sync::atomic::{AtomicU64, Ordering};

use super::watch::WatchOutcome;
use crate::metrics;

/// Running counters for one scanner.
///
/// Every update is mirrored into the process-wide Prometheus metrics.
#[derive(Debug, Default)]
pub struct ScanStats {
    pub scan_passes: AtomicU64,
    pub files_discovered: AtomicU64,
    pub files_foraged: AtomicU64,
    pub files_gone: AtomicU64,
    pub watches_cancelled: AtomicU64,
    pub active_watches: AtomicU64,
}

impl ScanStats {
    /// Create new stats.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_pass(&self) {
        self.scan_passes.fetch_add(1, Ordering::Relaxed);
        metrics::SCAN_PASSES_TOTAL.inc();
    }

    pub(crate) fn record_watch_started(&self) {
        self.files_discovered.fetch_add(1, Ordering::Relaxed);
        self.active_watches.fetch_add(1, Ordering::Relaxed);
        metrics::FILES_DISCOVERED_TOTAL.inc();
        metrics::ACTIVE_WATCHES.inc();
    }

    pub(crate) fn record_watch_finished(&self, outcome: WatchOutcome) {
        let (counter, metric) = match outcome {
            WatchOutcome::Settled => (&self.files_foraged, &*metrics::FILES_FORAGED_TOTAL),
            WatchOutcome::Gone => (&self.files_gone, &*metrics::FILES_GONE_TOTAL),
            WatchOutcome::Cancelled => {
                (&self.watches_cancelled, &*metrics::WATCHES_CANCELLED_TOTAL)
            }
        };
        counter.fetch_add(1, Ordering::Relaxed);
        metric.inc();

        self.active_watches.fetch_sub(1, Ordering::Relaxed);
        metrics::ACTIVE_WATCHES.dec();
    }

    /// Get a snapshot of current stats.
    #[must_use]
    pub fn snapshot(&self) -> ScanStatsSnapshot {
        ScanStatsSnapshot {
            scan_passes: self.scan_passes.load(Ordering::Relaxed),
            files_discovered: self.files_discovered.load(Ordering::Relaxed),
            files_foraged: self.files_foraged.load(Ordering::Relaxed),
            files_gone: self.files_gone.load(Ordering::Relaxed),
            watches_cancelled: self.watches_cancelled.load(Ordering::Relaxed),
            active_watches: self.active_watches.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of scan stats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStatsSnapshot {
    pub scan_passes: u64,
    pub files_discovered: u64,
    pub files_foraged: u64,
    pub files_gone: u64,
    pub watches_cancelled: u64,
    pub active_watches: u64,
}
