//! Batch sequence numbers

use std::sync::atomic::{AtomicU64, Ordering};

/// Source of batch sequence numbers
///
/// Must be strictly monotonic and never hand out the same number twice.
pub trait SequenceSource: Send + Sync {
    /// Return the current number and advance (post-increment)
    fn next(&self) -> u64;
}

/// Atomic counter, the default sequence source
#[derive(Debug, Default)]
pub struct AtomicSequence {
    next: AtomicU64,
}

impl AtomicSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting at `start` instead of zero
    pub fn starting_at(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }

    /// Number the next call will return
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}

impl SequenceSource for AtomicSequence {
    fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}
