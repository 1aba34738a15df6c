//! Simulation orchestrator - producers, bus and dispatcher.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use batch_bus::{BatchBus, ErrorReporter, Event, Operation, TracingReporter};
use contracts::{DeviceInformation, TrackerConfig};
use dispatcher::{create_transport, DispatchPolicy, Dispatcher, FlakyTransport};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::SimulationStats;
use crate::error::{CliError, Result};

/// Simulation configuration
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Loaded tracker configuration
    pub tracker: TrackerConfig,

    /// Concurrent producer tasks
    pub producers: u32,

    pub batches_per_producer: u32,

    pub events_per_batch: u32,

    /// Share of sends the transport fails on purpose
    pub failure_rate: f64,

    /// Hard stop (None = run until the bus is drained)
    pub duration: Option<Duration>,

    /// Failure injection seed
    pub seed: u64,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Counts anomalies and forwards them to tracing
#[derive(Debug, Default)]
struct CountingReporter {
    non_fatal: AtomicU64,
    fatal: AtomicU64,
}

impl ErrorReporter for CountingReporter {
    fn report(&self, error: &str, fatal: bool) {
        let counter = if fatal { &self.fatal } else { &self.non_fatal };
        counter.fetch_add(1, Ordering::Relaxed);
        TracingReporter.report(error, fatal);
    }
}

#[derive(Debug, Default)]
struct ProducerCounters {
    batches: AtomicU64,
    events: AtomicU64,
    operations: AtomicU64,
}

/// Main simulation orchestrator
pub struct Simulation {
    config: SimulationConfig,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    /// Run producers until done (or the deadline), then drain and stop the dispatcher
    pub async fn run(self) -> Result<SimulationStats> {
        self.check_arguments()?;
        let start_time = Instant::now();

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(SocketAddr::from(([0, 0, 0, 0], port)))
                .map_err(CliError::Metrics)?;
        }

        let reporter = Arc::new(CountingReporter::default());
        let mut builder = BatchBus::builder().reporter(reporter.clone());
        if let Some(device) = self.device_information() {
            builder = builder.device_information(device);
        }
        let bus = Arc::new(builder.build());

        let tracker = &self.config.tracker;
        let transport = create_transport("primary", &tracker.transport)?;
        let transport = FlakyTransport::new(transport, self.config.failure_rate, self.config.seed);
        let policy = DispatchPolicy::from(&tracker.dispatch);
        let interval = policy.interval;
        let correlation_id = self.correlation_id();

        info!(
            app_id = %tracker.tracker.app_id,
            transport = ?tracker.transport.kind,
            producers = self.config.producers,
            batches_per_producer = self.config.batches_per_producer,
            failure_rate = self.config.failure_rate,
            %correlation_id,
            "Starting simulation"
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let dispatcher_handle =
            Dispatcher::new(Arc::clone(&bus), transport, policy).spawn(shutdown_rx);

        let counters = Arc::new(ProducerCounters::default());
        let mut producers: Vec<_> = (0..self.config.producers)
            .map(|producer| {
                tokio::spawn(produce(
                    Arc::clone(&bus),
                    Arc::clone(&counters),
                    Arc::clone(&correlation_id),
                    producer,
                    self.config.batches_per_producer,
                    self.config.events_per_batch,
                    interval / 4,
                ))
            })
            .collect();

        let workload = async {
            for handle in producers.iter_mut() {
                handle.await.map_err(|e| CliError::task("producer", e))?;
            }
            info!("Producers finished, waiting for the bus to drain");
            while !is_drained(&bus) && !dispatcher_handle.is_finished() {
                tokio::time::sleep(interval).await;
            }
            Ok::<_, CliError>(())
        };

        match self.config.duration {
            Some(limit) => match tokio::time::timeout(limit, workload).await {
                Ok(result) => result?,
                Err(_) => warn!(limit_secs = limit.as_secs(), "Simulation deadline reached"),
            },
            None => workload.await?,
        }
        for handle in &producers {
            handle.abort();
        }

        // The dispatcher may already have stopped after giving up
        let _ = shutdown_tx.send(true);
        let report = dispatcher_handle
            .await
            .map_err(|e| CliError::task("dispatcher", e))?;

        let stats = SimulationStats {
            producers: self.config.producers,
            correlation_id: correlation_id.to_string(),
            batches_generated: counters.batches.load(Ordering::Relaxed),
            events_generated: counters.events.load(Ordering::Relaxed),
            operations_generated: counters.operations.load(Ordering::Relaxed),
            anomalies: reporter.non_fatal.load(Ordering::Relaxed),
            fatal_anomalies: reporter.fatal.load(Ordering::Relaxed),
            left_queued: bus.queued_len(),
            duration: start_time.elapsed(),
            report,
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            sent = stats.report.metrics.sent_count,
            gave_up = stats.report.gave_up,
            "Simulation complete"
        );

        Ok(stats)
    }

    fn check_arguments(&self) -> Result<()> {
        let rate = self.config.failure_rate;
        if !(0.0..=1.0).contains(&rate) {
            return Err(CliError::invalid_argument(
                "failure_rate",
                format!("must be within [0, 1], got {rate}"),
            ));
        }
        if self.config.producers == 0 {
            return Err(CliError::invalid_argument("producers", "must be >= 1"));
        }
        Ok(())
    }

    /// Session shared by every producer of one run
    fn correlation_id(&self) -> Arc<str> {
        format!(
            "{}-session-{}",
            self.config.tracker.tracker.app_id, self.config.seed
        )
        .into()
    }

    /// Configured device snapshot, with the tracker's app id filled in
    fn device_information(&self) -> Option<DeviceInformation> {
        let mut device = self.config.tracker.device.clone()?;
        if device.app_id.is_empty() {
            device.app_id = self.config.tracker.tracker.app_id.clone();
        }
        Some(device)
    }
}

fn is_drained(bus: &BatchBus) -> bool {
    bus.queued_len() == 0 && bus.pending_batch().is_none()
}

/// One producer: `batches` batches in the run's session, paced by `pace`
async fn produce(
    bus: Arc<BatchBus>,
    counters: Arc<ProducerCounters>,
    correlation_id: Arc<str>,
    producer: u32,
    batches: u32,
    events_per_batch: u32,
    pace: Duration,
) {
    for n in 0..batches {
        let events: Vec<Event> = (0..events_per_batch)
            .map(|k| Event::with_value(format!("p{producer}.b{n}.e{k}"), k.to_string()))
            .collect();
        // every fifth batch also records a screen view
        let operations = (n % 5 == 0).then(|| vec![Operation::new(1, "screen_view")]);

        counters
            .events
            .fetch_add(events.len() as u64, Ordering::Relaxed);
        counters.operations.fetch_add(
            operations.as_ref().map_or(0, Vec::len) as u64,
            Ordering::Relaxed,
        );

        let batch = bus.generate_batch(&*correlation_id, Some(events), operations);
        bus.add(batch);
        counters.batches.fetch_add(1, Ordering::Relaxed);

        if !pace.is_zero() {
            tokio::time::sleep(pace).await;
        } else {
            tokio::task::yield_now().await;
        }
    }
    debug!(producer, batches, "Producer finished");
}
