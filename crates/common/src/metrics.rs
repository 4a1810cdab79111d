//! Metrics collection for the export pipeline.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Global metrics instance.
static METRICS: std::sync::OnceLock<Arc<Metrics>> = std::sync::OnceLock::new();

/// Get the global metrics instance.
pub fn get_metrics() -> &'static Arc<Metrics> {
    METRICS.get_or_init(|| Arc::new(Metrics::new()))
}

/// Export metrics collector.
#[derive(Debug)]
pub struct Metrics {
    /// Export jobs created.
    pub exports_requested: AtomicU64,
    /// Export payloads published to the queue.
    pub exports_queued: AtomicU64,
    /// Export jobs completed.
    pub exports_completed: AtomicU64,
    /// Export jobs failed.
    pub exports_failed: AtomicU64,
    /// Rows written across all exports.
    pub records_exported: AtomicU64,
    /// Total processing time of finished exports in milliseconds.
    pub export_time_ms_total: AtomicU64,
}

impl Metrics {
    /// Create a new metrics instance with all counters at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            exports_requested: AtomicU64::new(0),
            exports_queued: AtomicU64::new(0),
            exports_completed: AtomicU64::new(0),
            exports_failed: AtomicU64::new(0),
            records_exported: AtomicU64::new(0),
            export_time_ms_total: AtomicU64::new(0),
        }
    }

    /// Record a new export job.
    pub fn record_requested(&self) {
        self.exports_requested.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a payload handed to the queue.
    pub fn record_queued(&self) {
        self.exports_queued.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a finished export.
    pub fn record_finished(&self, success: bool, records: u64, duration: Duration) {
        if success {
            self.exports_completed.fetch_add(1, Ordering::Relaxed);
            self.records_exported.fetch_add(records, Ordering::Relaxed);
        } else {
            self.exports_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.export_time_ms_total
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let completed = self.exports_completed.load(Ordering::Relaxed);
        let failed = self.exports_failed.load(Ordering::Relaxed);
        let finished = completed + failed;
        let total_ms = self.export_time_ms_total.load(Ordering::Relaxed);

        MetricsSnapshot {
            exports_requested: self.exports_requested.load(Ordering::Relaxed),
            exports_queued: self.exports_queued.load(Ordering::Relaxed),
            exports_completed: completed,
            exports_failed: failed,
            records_exported: self.records_exported.load(Ordering::Relaxed),
            export_avg_time_ms: if finished > 0 { total_ms / finished } else { 0 },
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of all metrics at a point in time.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub exports_requested: u64,
    pub exports_queued: u64,
    pub exports_completed: u64,
    pub exports_failed: u64,
    pub records_exported: u64,
    pub export_avg_time_ms: u64,
}

/// Timer guard for measuring operation duration.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration since timer start.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = Metrics::new();
        assert_eq!(metrics.exports_requested.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.records_exported.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_record_finished() {
        let metrics = Metrics::new();

        metrics.record_finished(true, 6, Duration::from_millis(30));
        metrics.record_finished(false, 4, Duration::from_millis(10));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.exports_completed, 1);
        assert_eq!(snapshot.exports_failed, 1);
        // Failed exports do not count their partial rows.
        assert_eq!(snapshot.records_exported, 6);
        assert_eq!(snapshot.export_avg_time_ms, 20);
    }
}
