//! Transport implementations
//!
//! Contains LogTransport, FileTransport and the FlakyTransport wrapper.

mod file;
mod flaky;
mod log;

pub use self::file::FileTransport;
pub use self::flaky::FlakyTransport;
pub use self::log::LogTransport;

use contracts::{Batch, BatchTransport, ContractError, TransportConfig, TransportKind};
use tracing::instrument;

use crate::error::DispatcherError;

/// Transport chosen from configuration
pub enum AnyTransport {
    Log(LogTransport),
    File(FileTransport),
}

impl BatchTransport for AnyTransport {
    fn name(&self) -> &str {
        match self {
            Self::Log(t) => t.name(),
            Self::File(t) => t.name(),
        }
    }

    async fn send(&mut self, batch: &Batch) -> Result<(), ContractError> {
        match self {
            Self::Log(t) => t.send(batch).await,
            Self::File(t) => t.send(batch).await,
        }
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        match self {
            Self::Log(t) => t.flush().await,
            Self::File(t) => t.flush().await,
        }
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        match self {
            Self::Log(t) => t.close().await,
            Self::File(t) => t.close().await,
        }
    }
}

/// Create a transport from configuration
#[instrument(name = "dispatcher_create_transport", skip(config), fields(kind = ?config.kind))]
pub fn create_transport(
    name: &str,
    config: &TransportConfig,
) -> Result<AnyTransport, DispatcherError> {
    match config.kind {
        TransportKind::Log => Ok(AnyTransport::Log(LogTransport::new(name))),
        TransportKind::File => {
            let path = config
                .path
                .as_ref()
                .ok_or_else(|| DispatcherError::transport_creation(name, "missing 'path'"))?;
            let transport = FileTransport::new(name, path)
                .map_err(|e| DispatcherError::transport_creation(name, e.to_string()))?;
            Ok(AnyTransport::File(transport))
        }
    }
}
