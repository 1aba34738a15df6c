//! LogTransport - logs batch summaries via tracing

use contracts::{Batch, BatchTransport, ContractError};
use tracing::{info, instrument};

/// Transport that only logs what it would have sent
pub struct LogTransport {
    name: String,
}

impl LogTransport {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_batch_summary(&self, batch: &Batch) {
        info!(
            transport = %self.name,
            number = batch.number(),
            correlation_id = %batch.correlation_id(),
            events = batch.events().len(),
            operations = batch.operations().len(),
            retries = batch.retries(),
            "Batch dispatched"
        );
    }
}

impl BatchTransport for LogTransport {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_transport_send",
        skip(self, batch),
        fields(transport = %self.name, number = batch.number())
    )]
    async fn send(&mut self, batch: &Batch) -> Result<(), ContractError> {
        self.log_batch_summary(batch);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_transport_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(transport = %self.name, "LogTransport closed");
        Ok(())
    }
}
