//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Catalog syncs (runs, duration, items imported/failed/removed)
//! - Catalog source pagination
//! - Scheduler cycles

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Catalog Sync Metrics
// =============================================================================

/// Sync runs total by result.
pub static SYNC_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("shelfsync_sync_runs_total", "Total catalog sync runs"),
        &["result"], // "completed", "failed", "cancelled"
    )
    .unwrap()
});

/// Sync duration in seconds.
pub static SYNC_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "shelfsync_sync_duration_seconds",
            "Duration of a catalog sync run",
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 300.0, 900.0, 1800.0, 3600.0]),
        &["result"],
    )
    .unwrap()
});

/// Items added to collections.
pub static ITEMS_IMPORTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "shelfsync_items_imported_total",
        "Catalog items inserted and added to their collection",
    )
    .unwrap()
});

/// Items whose insertion failed.
pub static ITEMS_FAILED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "shelfsync_items_failed_total",
            "Catalog items that could not be imported",
        ),
        &["reason"], // "insert", "timeout", "collection", "no_item"
    )
    .unwrap()
});

/// Items removed from collections.
pub static ITEMS_REMOVED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "shelfsync_items_removed_total",
        "Collection members removed because they left their catalog",
    )
    .unwrap()
});

// =============================================================================
// Catalog Source Metrics
// =============================================================================

/// Catalog pages fetched by status.
pub static PAGES_FETCHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("shelfsync_pages_fetched_total", "Catalog pages fetched"),
        &["status"], // "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Scheduler Metrics
// =============================================================================

/// Scheduler cycles by result.
pub static SCHEDULER_CYCLES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("shelfsync_scheduler_cycles_total", "Scheduled sync cycles"),
        &["result"], // "completed", "skipped", "cancelled"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Sync
        Box::new(SYNC_RUNS.clone()),
        Box::new(SYNC_DURATION.clone()),
        Box::new(ITEMS_IMPORTED.clone()),
        Box::new(ITEMS_FAILED.clone()),
        Box::new(ITEMS_REMOVED.clone()),
        // Source
        Box::new(PAGES_FETCHED.clone()),
        // Scheduler
        Box::new(SCHEDULER_CYCLES.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_metrics_register() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
        SYNC_RUNS.with_label_values(&["completed"]).inc();
        let families = registry.gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "shelfsync_sync_runs_total"));
    }
}
