//! Batch bus error types

use thiserror::Error;

/// Caller-contract violations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchBusError {
    /// `pre_dispatch` called while nothing is in flight
    #[error("no pending batch to dispatch; call set_pending_batch first")]
    NoPendingBatch,
}
