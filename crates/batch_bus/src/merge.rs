//! Lossless merge of queued batches.
//!
//! Only records survive a merge; device snapshot, timestamp and sequence number
//! are regenerated by the bus for the merged batch.

use contracts::{Batch, Event, Operation};
use tracing::warn;

/// Records and correlation id collected from several batches
#[derive(Debug, Default)]
pub(crate) struct MergedRecords {
    /// Correlation id of the oldest source batch
    pub correlation_id: String,
    pub events: Vec<Event>,
    pub operations: Vec<Operation>,
}

/// Concatenate records of `batches` in queue order.
///
/// Events and operations keep their relative order and are never interleaved
/// with each other.
pub(crate) fn merge_records(batches: Vec<Batch>) -> MergedRecords {
    let Some(first) = batches.first() else {
        return MergedRecords::default();
    };
    let correlation_id = first.correlation_id().to_string();

    let event_count = batches.iter().map(|b| b.events().len()).sum();
    let operation_count = batches.iter().map(|b| b.operations().len()).sum();
    let mut merged = MergedRecords {
        correlation_id,
        events: Vec::with_capacity(event_count),
        operations: Vec::with_capacity(operation_count),
    };

    for batch in batches {
        if batch.correlation_id() != merged.correlation_id {
            warn!(
                kept = %merged.correlation_id,
                dropped = %batch.correlation_id(),
                number = batch.number(),
                "Merging batches from different sessions"
            );
        }
        let (events, operations) = batch.into_records();
        merged.events.extend(events);
        merged.operations.extend(operations);
    }

    merged
}
