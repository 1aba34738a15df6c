//! Dispatcher - periodic consolidation and delivery of batches

use std::sync::Arc;
use std::time::Duration;

use batch_bus::{BatchBus, Consolidation};
use contracts::{BatchTransport, DispatchConfig};
use observability::{DispatchStatsAggregator, DispatchSummary};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use crate::metrics::{MetricsSnapshot, TransportMetrics};

/// Upper bound on shutdown ticks (in-flight batch plus merged queue)
const FINAL_DRAIN_TICKS: usize = 3;

/// When and how often to dispatch, and when to give up
#[derive(Debug, Clone)]
pub struct DispatchPolicy {
    /// Tick interval
    pub interval: Duration,
    /// Consecutive failures after which the in-flight batch is abandoned
    pub max_retries: u32,
    /// Fire the first tick immediately instead of after one interval
    pub force_start_timer: bool,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self::from(&DispatchConfig::default())
    }
}

impl From<&DispatchConfig> for DispatchPolicy {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            interval: config.interval(),
            max_retries: config.max_retries,
            force_start_timer: config.force_start_timer,
        }
    }
}

/// Result of a single dispatch tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A previous attempt is still outstanding
    Skipped,
    /// Nothing queued and nothing in flight
    Idle,
    /// Batch acknowledged by the transport
    Sent { number: u64, records: usize },
    /// Transport failed; batch stays in flight
    Failed { number: u64, retries: u32 },
    /// Retry limit reached; in-flight batch and queue discarded
    GaveUp { number: u64, retries: u32 },
}

/// Final report of a dispatcher run
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub summary: DispatchSummary,
    pub metrics: MetricsSnapshot,
    /// Run ended because the retry limit was reached
    pub gave_up: bool,
}

/// Drives one `BatchBus` through a transport
pub struct Dispatcher<T> {
    bus: Arc<BatchBus>,
    transport: T,
    policy: DispatchPolicy,
    metrics: Arc<TransportMetrics>,
    stats: DispatchStatsAggregator,
}

impl<T: BatchTransport> Dispatcher<T> {
    pub fn new(bus: Arc<BatchBus>, transport: T, policy: DispatchPolicy) -> Self {
        Self {
            bus,
            transport,
            policy,
            metrics: Arc::new(TransportMetrics::new()),
            stats: DispatchStatsAggregator::new(),
        }
    }

    pub fn bus(&self) -> &Arc<BatchBus> {
        &self.bus
    }

    /// Shared counters, readable while the dispatcher runs
    pub fn metrics(&self) -> &Arc<TransportMetrics> {
        &self.metrics
    }

    pub fn stats(&self) -> &DispatchStatsAggregator {
        &self.stats
    }

    /// Perform one dispatch attempt
    #[instrument(
        name = "dispatcher_tick",
        skip(self),
        fields(transport = %self.transport.name())
    )]
    pub async fn tick(&mut self) -> TickOutcome {
        if self.bus.awaiting_callback() {
            self.metrics.inc_skipped_count();
            debug!("Previous dispatch still awaiting callback");
            return TickOutcome::Skipped;
        }

        match self.bus.set_pending_batch() {
            Consolidation::Empty => return TickOutcome::Idle,
            Consolidation::Merged { .. } => self.metrics.inc_merged_count(),
            Consolidation::Promoted { .. } | Consolidation::Busy { .. } => {}
        }

        let retries = self.bus.retries();
        if retries >= self.policy.max_retries {
            return self.give_up(retries);
        }

        if let Err(e) = self.bus.pre_dispatch() {
            warn!(error = %e, "Nothing to dispatch");
            return TickOutcome::Idle;
        }
        let Some(batch) = self.bus.pending_batch() else {
            return TickOutcome::Idle;
        };

        let number = batch.number();
        match self.transport.send(&batch).await {
            Ok(()) => {
                self.bus.on_batch_succeeded();
                self.metrics.inc_sent_count();
                self.stats.record_sent(batch.record_count(), batch.retries());
                observability::record_dispatch_outcome(self.transport.name(), true);
                TickOutcome::Sent {
                    number,
                    records: batch.record_count(),
                }
            }
            Err(e) => {
                self.bus.on_batch_failed();
                self.metrics.inc_failure_count();
                self.stats.record_failed();
                observability::record_dispatch_outcome(self.transport.name(), false);
                let retries = self.bus.retries();
                warn!(number, retries, error = %e, "Dispatch failed");
                TickOutcome::Failed { number, retries }
            }
        }
    }

    fn give_up(&mut self, retries: u32) -> TickOutcome {
        let number = self
            .bus
            .pending_batch()
            .map(|b| b.number())
            .unwrap_or_default();
        let dropped_queue = self.bus.queued_len();

        self.bus.clear_pending();
        self.bus.clear_batches();
        self.bus.reset_retries();
        self.metrics.inc_given_up_count();
        self.stats.record_given_up();

        error!(
            number,
            retries,
            dropped_queue,
            max_retries = self.policy.max_retries,
            "Retry limit reached, discarding pending batches"
        );
        TickOutcome::GaveUp { number, retries }
    }

    /// Tick until shutdown is signalled or the retry limit is reached
    ///
    /// On shutdown whatever is left is drained over a few final ticks.
    #[instrument(name = "dispatcher_run", skip(self, shutdown))]
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> DispatchReport {
        info!(
            transport = %self.transport.name(),
            interval_ms = self.policy.interval.as_millis() as u64,
            max_retries = self.policy.max_retries,
            "Dispatcher started"
        );

        let start = if self.policy.force_start_timer {
            Instant::now()
        } else {
            Instant::now() + self.policy.interval
        };
        let mut ticker = time::interval_at(start, self.policy.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut gave_up = false;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let TickOutcome::GaveUp { .. } = self.tick().await {
                        gave_up = true;
                        break;
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("Shutdown signal received");
                        break;
                    }
                }
            }
        }

        if !gave_up {
            self.drain().await;
        }

        if let Err(e) = self.transport.flush().await {
            error!(error = %e, "Flush failed on shutdown");
        }
        if let Err(e) = self.transport.close().await {
            error!(error = %e, "Close failed on shutdown");
        }

        let report = DispatchReport {
            summary: self.stats.summary(),
            metrics: self.metrics.snapshot(),
            gave_up,
        };
        info!(
            sent = report.metrics.sent_count,
            failed = report.metrics.failure_count,
            gave_up,
            "Dispatcher stopped"
        );
        report
    }

    /// Flush what is left on shutdown: the in-flight batch first, then the queue
    ///
    /// Stops at the first tick that does not deliver anything.
    async fn drain(&mut self) {
        for _ in 0..FINAL_DRAIN_TICKS {
            if self.bus.queued_len() == 0 && self.bus.pending_batch().is_none() {
                return;
            }
            let outcome = self.tick().await;
            info!(?outcome, "Final dispatch attempt");
            if !matches!(outcome, TickOutcome::Sent { .. }) {
                return;
            }
        }
    }
}

impl<T: BatchTransport + 'static> Dispatcher<T> {
    /// Spawn the dispatcher as a background task
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<DispatchReport> {
        tokio::spawn(self.run(shutdown))
    }
}
