//! Transport metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one dispatcher / transport pair
#[derive(Debug, Default)]
pub struct TransportMetrics {
    /// Batches acknowledged
    sent_count: AtomicU64,
    /// Failed attempts
    failure_count: AtomicU64,
    /// Batches abandoned after the retry limit
    given_up_count: AtomicU64,
    /// Ticks skipped because a callback was outstanding
    skipped_count: AtomicU64,
    /// Consolidations that merged two or more queued batches
    merged_count: AtomicU64,
}

impl TransportMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent_count(&self) -> u64 {
        self.sent_count.load(Ordering::Relaxed)
    }

    pub fn inc_sent_count(&self) {
        self.sent_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn given_up_count(&self) -> u64 {
        self.given_up_count.load(Ordering::Relaxed)
    }

    pub fn inc_given_up_count(&self) {
        self.given_up_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn skipped_count(&self) -> u64 {
        self.skipped_count.load(Ordering::Relaxed)
    }

    pub fn inc_skipped_count(&self) {
        self.skipped_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn merged_count(&self) -> u64 {
        self.merged_count.load(Ordering::Relaxed)
    }

    pub fn inc_merged_count(&self) {
        self.merged_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sent_count: self.sent_count(),
            failure_count: self.failure_count(),
            given_up_count: self.given_up_count(),
            skipped_count: self.skipped_count(),
            merged_count: self.merged_count(),
        }
    }
}

/// Snapshot of transport metrics (for reporting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub sent_count: u64,
    pub failure_count: u64,
    pub given_up_count: u64,
    pub skipped_count: u64,
    pub merged_count: u64,
}
