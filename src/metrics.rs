//! Prometheus metrics definitions.

use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_gauge, IntCounter, IntGauge};

/// Completed directory scan passes.
pub static SCAN_PASSES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("forager_scan_passes_total", "Completed directory scan passes")
        .expect("register forager_scan_passes_total")
});

/// Files handed to a watcher.
pub static FILES_DISCOVERED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "forager_files_discovered_total",
        "Files discovered and handed to a watcher"
    )
    .expect("register forager_files_discovered_total")
});

/// Files that settled and were foraged.
pub static FILES_FORAGED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("forager_files_foraged_total", "Files passed to the forager")
        .expect("register forager_files_foraged_total")
});

/// Files that disappeared before settling.
pub static FILES_GONE_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "forager_files_gone_total",
        "Files removed or unreadable before settling"
    )
    .expect("register forager_files_gone_total")
});

/// Watches ended by cancellation.
pub static WATCHES_CANCELLED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "forager_watches_cancelled_total",
        "Watches stopped by cancellation"
    )
    .expect("register forager_watches_cancelled_total")
});

/// Watches currently polling.
pub static ACTIVE_WATCHES: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("forager_active_watches", "Watches currently polling")
        .expect("register forager_active_watches")
});

/// Initialize all metrics (call once at startup).
pub fn init_metrics() {
    // Access lazy statics to register them
    let _ = &*SCAN_PASSES_TOTAL;
    let _ = &*FILES_DISCOVERED_TOTAL;
    let _ = &*FILES_FORAGED_TOTAL;
    let _ = &*FILES_GONE_TOTAL;
    let _ = &*WATCHES_CANCELLED_TOTAL;
    let _ = &*ACTIVE_WATCHES;

    tracing::debug!("Prometheus metrics initialized");
}
