//! BatchTransport trait - Dispatcher output interface
//!
//! Wire format and protocol are owned by the implementation.

use crate::{Batch, ContractError};

/// Outbound batch transport
///
/// All transport implementations must implement this trait.
#[trait_variant::make(BatchTransport: Send)]
pub trait LocalBatchTransport {
    /// Transport name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Deliver one batch
    ///
    /// # Errors
    /// Any error is treated as a failed attempt; the batch stays in flight.
    async fn send(&mut self, batch: &Batch) -> Result<(), ContractError>;

    /// Flush buffered output (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Release resources
    async fn close(&mut self) -> Result<(), ContractError>;
}
