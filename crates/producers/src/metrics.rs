//! Per-producer counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared between a running producer task and its handle
#[derive(Debug, Default)]
pub struct ProducerMetrics {
    /// Raw packets or page samples read
    pub packets_received: AtomicU64,

    /// Frames handed to the supervisor
    pub frames_emitted: AtomicU64,

    /// Decode / resource errors raised
    pub errors: AtomicU64,

    /// Errors discarded because the error channel was full
    pub errors_dropped: AtomicU64,
}

impl ProducerMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_packet(&self) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_emitted(&self) {
        self.frames_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error_dropped(&self) {
        self.errors_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> ProducerMetricsSnapshot {
        ProducerMetricsSnapshot {
            packets_received: self.packets_received.load(Ordering::Relaxed),
            frames_emitted: self.frames_emitted.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            errors_dropped: self.errors_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerMetricsSnapshot {
    pub packets_received: u64,
    pub frames_emitted: u64,
    pub errors: u64,
    pub errors_dropped: u64,
}
