//! # Dispatcher
//!
//! Reference dispatcher for a `BatchBus`.
//!
//! Responsibilities:
//! - Tick on a fixed interval and consolidate queued batches
//! - Deliver the in-flight batch through a `BatchTransport`
//! - Report success/failure back to the bus and give up after the retry limit

pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod transports;

pub use contracts::{BatchTransport, DispatchConfig};
pub use dispatcher::{DispatchPolicy, DispatchReport, Dispatcher, TickOutcome};
pub use error::DispatcherError;
pub use metrics::{MetricsSnapshot, TransportMetrics};
pub use transports::{create_transport, AnyTransport, FileTransport, FlakyTransport, LogTransport};
