//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace: the
//! telemetry records, the `Batch` dispatch unit, collaborator traits and the
//! configuration model. Business crates depend on this crate, never the reverse.
//!
//! ## Time Model
//! - All timestamps are wall-clock UTC (`chrono::DateTime<Utc>`)
//! - Arrival order of records is their position in a sequence, not their timestamp

mod batch;
mod config;
mod device;
mod error;
mod record;
mod reporter;
mod transport;

pub use batch::*;
pub use config::*;
pub use device::DeviceInformation;
pub use error::*;
pub use record::{Event, Operation};
pub use reporter::ErrorReporter;
pub use transport::{BatchTransport, LocalBatchTransport};
