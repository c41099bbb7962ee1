//! Per-store operational counters
//!
//! Counters only, monotonic, reset on process start. Relaxed ordering:
//! the values are informational and never gate behaviour.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters owned by one `WalStore`
#[derive(Debug, Default)]
pub struct WalMetrics {
    records_appended: AtomicU64,
    lines_written: AtomicU64,
    forced_flushes: AtomicU64,
    capacity_flushes: AtomicU64,
    checkpoints: AtomicU64,
    checkpoint_failures: AtomicU64,
    rollbacks: AtomicU64,
    crash_recoveries: AtomicU64,
    recovery_failures: AtomicU64,
    lines_skipped: AtomicU64,
}

impl WalMetrics {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_append(&self) {
        self.records_appended.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_lines_written(&self, lines: u64) {
        self.lines_written.fetch_add(lines, Ordering::Relaxed);
    }

    pub(crate) fn record_forced_flush(&self) {
        self.forced_flushes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_capacity_flush(&self) {
        self.capacity_flushes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_checkpoint(&self) {
        self.checkpoints.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_checkpoint_failure(&self) {
        self.checkpoint_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rollback(&self) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_crash_recovery(&self) {
        self.crash_recoveries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_recovery_failure(&self) {
        self.recovery_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_lines_skipped(&self, lines: u64) {
        self.lines_skipped.fetch_add(lines, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_appended: self.records_appended.load(Ordering::Relaxed),
            lines_written: self.lines_written.load(Ordering::Relaxed),
            forced_flushes: self.forced_flushes.load(Ordering::Relaxed),
            capacity_flushes: self.capacity_flushes.load(Ordering::Relaxed),
            checkpoints: self.checkpoints.load(Ordering::Relaxed),
            checkpoint_failures: self.checkpoint_failures.load(Ordering::Relaxed),
            rollbacks: self.rollbacks.load(Ordering::Relaxed),
            crash_recoveries: self.crash_recoveries.load(Ordering::Relaxed),
            recovery_failures: self.recovery_failures.load(Ordering::Relaxed),
            lines_skipped: self.lines_skipped.load(Ordering::Relaxed),
        }
    }

    /// Counters as a single JSON object
    pub fn to_json(&self) -> String {
        let s = self.snapshot();
        format!(
            r#"{{"records_appended":{},"lines_written":{},"forced_flushes":{},"capacity_flushes":{},"checkpoints":{},"checkpoint_failures":{},"rollbacks":{},"crash_recoveries":{},"recovery_failures":{},"lines_skipped":{}}}"#,
            s.records_appended,
            s.lines_written,
            s.forced_flushes,
            s.capacity_flushes,
            s.checkpoints,
            s.checkpoint_failures,
            s.rollbacks,
            s.crash_recoveries,
            s.recovery_failures,
            s.lines_skipped,
        )
    }
}

/// A point-in-time copy of [`WalMetrics`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub records_appended: u64,
    pub lines_written: u64,
    pub forced_flushes: u64,
    pub capacity_flushes: u64,
    pub checkpoints: u64,
    pub checkpoint_failures: u64,
    pub rollbacks: u64,
    pub crash_recoveries: u64,
    pub recovery_failures: u64,
    pub lines_skipped: u64,
}
