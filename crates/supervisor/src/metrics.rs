//! Session metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters for a single session
#[derive(Debug, Default)]
pub struct SessionMetrics {
    /// Frames read from the producer
    received: AtomicU64,
    /// Frames dropped by the rate limiter
    throttled: AtomicU64,
    /// Frames that failed conversion to the sink shape
    conversion_failures: AtomicU64,
    /// Frames handed to the sink
    accepted: AtomicU64,
    /// Successful sink deliveries
    delivered: AtomicU64,
    /// Failed or timed-out sink deliveries
    sink_failures: AtomicU64,
    /// Errors reported by the producer
    producer_errors: AtomicU64,
}

impl SessionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_throttled(&self) {
        self.throttled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_conversion_failures(&self) {
        self.conversion_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_sink_failures(&self) {
        self.sink_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_producer_errors(&self) {
        self.producer_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            throttled: self.throttled.load(Ordering::Relaxed),
            conversion_failures: self.conversion_failures.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            producer_errors: self.producer_errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of session metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub received: u64,
    pub throttled: u64,
    pub conversion_failures: u64,
    pub accepted: u64,
    pub delivered: u64,
    pub sink_failures: u64,
    pub producer_errors: u64,
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Frames received: {}", self.received)?;
        writeln!(f, "Dropped by throttle: {}", self.throttled)?;
        writeln!(f, "Conversion failures: {}", self.conversion_failures)?;
        writeln!(
            f,
            "Forwarded: {} (delivered {}, failed {})",
            self.accepted, self.delivered, self.sink_failures
        )?;
        write!(f, "Producer errors: {}", self.producer_errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts() {
        let metrics = SessionMetrics::new();
        metrics.inc_received();
        metrics.inc_received();
        metrics.inc_throttled();
        metrics.inc_accepted();
        metrics.inc_sink_failures();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.received, 2);
        assert_eq!(snapshot.throttled, 1);
        assert_eq!(snapshot.accepted, 1);
        assert_eq!(snapshot.delivered, 0);
        assert_eq!(snapshot.sink_failures, 1);
        assert!(snapshot.to_string().contains("Forwarded: 1 (delivered 0, failed 1)"));
    }
}
