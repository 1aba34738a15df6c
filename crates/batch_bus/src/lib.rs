//! # Batch Bus
//!
//! Batch aggregation and dispatch-state coordinator.
//!
//! Responsibilities:
//! - Materialise finished record buffers as `Batch`es with unique sequence numbers
//! - Queue batches from concurrent producers
//! - Consolidate the queue into a single in-flight batch on demand
//! - Track retries and the awaiting-callback flag for one dispatcher
//!
//! ## Example
//!
//! ```
//! use batch_bus::{BatchBus, Consolidation};
//! use contracts::Event;
//!
//! let bus = BatchBus::new();
//! let batch = bus.generate_batch("session-1", Some(vec![Event::new("launch")]), None);
//! bus.add(batch);
//!
//! assert!(matches!(bus.set_pending_batch(), Consolidation::Promoted { .. }));
//! bus.pre_dispatch().unwrap();
//! // ... send bus.pending_batch() ...
//! bus.on_batch_succeeded();
//! assert!(bus.pending_batch().is_none());
//! ```

mod bus;
mod error;
mod merge;
mod reporter;
mod sequence;

pub use bus::{BatchBus, BatchBusBuilder, Consolidation};
pub use error::BatchBusError;
pub use reporter::{CollectingReporter, Report, TracingReporter};
pub use sequence::{AtomicSequence, SequenceSource};

// Re-export contracts types
pub use contracts::{Batch, DeviceInformation, ErrorReporter, Event, Operation};
