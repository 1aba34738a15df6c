//! Batch pipeline metrics
//!
//! Thin helpers over the `metrics` facade plus an in-memory aggregator for
//! end-of-run summaries. Without an installed recorder the helpers are no-ops.

use metrics::{counter, gauge, histogram};

/// Record a freshly generated batch
pub fn record_batch_generated(events: usize, operations: usize) {
    counter!("batchbus_batches_generated_total").increment(1);
    histogram!("batchbus_batch_events").record(events as f64);
    histogram!("batchbus_batch_operations").record(operations as f64);
}

/// Record an enqueue and the resulting queue depth
pub fn record_batch_enqueued(depth: usize) {
    counter!("batchbus_batches_enqueued_total").increment(1);
    gauge!("batchbus_queue_depth").set(depth as f64);
}

/// Record a consolidation step
///
/// `kind` is one of `empty`, `promoted`, `merged`, `busy`.
pub fn record_consolidation(kind: &'static str, sources: usize) {
    counter!("batchbus_consolidations_total", "kind" => kind).increment(1);
    if sources > 1 {
        histogram!("batchbus_merge_sources").record(sources as f64);
    }
    if drains_queue(kind) {
        gauge!("batchbus_queue_depth").set(0.0);
    }
}

/// Whether a consolidation of this kind moved the whole queue into flight
///
/// `busy` leaves the queue untouched and `empty` found nothing to move.
fn drains_queue(kind: &str) -> bool {
    matches!(kind, "promoted" | "merged")
}

/// Record the outcome of a dispatch attempt
pub fn record_dispatch_outcome(transport: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "batchbus_dispatch_attempts_total",
        "transport" => transport.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record the consecutive-failure counter
pub fn record_retries(retries: u32) {
    gauge!("batchbus_consecutive_failures").set(retries as f64);
}

/// Record an internal-consistency anomaly
pub fn record_anomaly(fatal: bool) {
    let severity = if fatal { "fatal" } else { "non_fatal" };
    counter!("batchbus_anomalies_total", "severity" => severity).increment(1);
}

/// Dispatch statistics aggregator
///
/// Aggregates in memory for summaries printed at shutdown.
#[derive(Debug, Clone, Default)]
pub struct DispatchStatsAggregator {
    /// Successful dispatches
    pub sent: u64,

    /// Failed dispatch attempts
    pub failed: u64,

    /// Batches abandoned after exceeding the retry limit
    pub given_up: u64,

    /// Records (events + operations) delivered
    pub records_delivered: u64,

    /// Records per delivered batch
    pub batch_size_stats: RunningStats,

    /// Retry stamp of delivered batches
    pub retry_stats: RunningStats,
}

impl DispatchStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account one successful dispatch
    pub fn record_sent(&mut self, records: usize, retries: u32) {
        self.sent += 1;
        self.records_delivered += records as u64;
        self.batch_size_stats.push(records as f64);
        self.retry_stats.push(retries as f64);
    }

    /// Account one failed attempt
    pub fn record_failed(&mut self) {
        self.failed += 1;
    }

    /// Account one abandoned batch
    pub fn record_given_up(&mut self) {
        self.given_up += 1;
    }

    pub fn summary(&self) -> DispatchSummary {
        let attempts = self.sent + self.failed;
        DispatchSummary {
            sent: self.sent,
            failed: self.failed,
            given_up: self.given_up,
            records_delivered: self.records_delivered,
            failure_rate: if attempts > 0 {
                self.failed as f64 / attempts as f64 * 100.0
            } else {
                0.0
            },
            batch_size: StatsSummary::from(&self.batch_size_stats),
            retries: StatsSummary::from(&self.retry_stats),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Dispatch summary
#[derive(Debug, Clone, Default)]
pub struct DispatchSummary {
    pub sent: u64,
    pub failed: u64,
    pub given_up: u64,
    pub records_delivered: u64,
    pub failure_rate: f64,
    pub batch_size: StatsSummary,
    pub retries: StatsSummary,
}

impl std::fmt::Display for DispatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Summary ===")?;
        writeln!(f, "Batches sent: {}", self.sent)?;
        writeln!(
            f,
            "Failed attempts: {} ({:.2}%)",
            self.failed, self.failure_rate
        )?;
        writeln!(f, "Given up: {}", self.given_up)?;
        writeln!(f, "Records delivered: {}", self.records_delivered)?;
        writeln!(f, "Records per batch: {}", self.batch_size)?;
        writeln!(f, "Retries per batch: {}", self.retries)
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.2}, std={:.2} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
