//! Writer metrics.
//!
//! Counters only, monotonic, reset on writer construction. Thread-safe with
//! Relaxed atomics; metrics are observational and never influence the write
//! path. Counters advance only after the force for the batch has completed,
//! so a snapshot never counts work that is not yet durable.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one writer instance.
#[derive(Debug, Default)]
pub struct WriterMetrics {
    /// Records durably written.
    total_writes: AtomicU64,
    /// Frame bytes durably written (excludes the file header).
    total_bytes: AtomicU64,
    /// Force-to-storage operations performed for record batches.
    total_flushes: AtomicU64,
}

impl WriterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one completed batch: `writes` records, `bytes` frame bytes,
    /// one force.
    pub fn record_batch(&self, writes: u64, bytes: u64) {
        self.total_writes.fetch_add(writes, Ordering::Relaxed);
        self.total_bytes.fetch_add(bytes, Ordering::Relaxed);
        self.total_flushes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_writes: self.total_writes.load(Ordering::Relaxed),
            total_bytes: self.total_bytes.load(Ordering::Relaxed),
            total_flushes: self.total_flushes.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of a writer's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub total_writes: u64,
    pub total_bytes: u64,
    pub total_flushes: u64,
}

impl StatsSnapshot {
    /// Average records amortized per force; 0.0 before the first flush.
    pub fn writes_per_flush(&self) -> f64 {
        if self.total_flushes == 0 {
            0.0
        } else {
            self.total_writes as f64 / self.total_flushes as f64
        }
    }
}
