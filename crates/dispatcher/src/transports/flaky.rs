//! FlakyTransport - failure injection around another transport

use contracts::{Batch, BatchTransport, ContractError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Wraps a transport and fails a share of sends without forwarding them
pub struct FlakyTransport<T> {
    inner: T,
    failure_rate: f64,
    rng: StdRng,
}

impl<T: BatchTransport> FlakyTransport<T> {
    /// `failure_rate` is clamped to `[0, 1]`
    pub fn new(inner: T, failure_rate: f64, seed: u64) -> Self {
        Self {
            inner,
            failure_rate: failure_rate.clamp(0.0, 1.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: BatchTransport> BatchTransport for FlakyTransport<T> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn send(&mut self, batch: &Batch) -> Result<(), ContractError> {
        if self.rng.random_bool(self.failure_rate) {
            debug!(number = batch.number(), "Injected transport failure");
            return Err(ContractError::transport_send(
                self.inner.name(),
                batch.number(),
                "injected failure",
            ));
        }
        self.inner.send(batch).await
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        self.inner.flush().await
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        self.inner.close().await
    }
}
