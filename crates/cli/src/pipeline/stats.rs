//! Simulation statistics.

use std::time::Duration;

use dispatcher::DispatchReport;

/// Statistics from a simulation run
#[derive(Debug, Clone)]
pub struct SimulationStats {
    pub producers: u32,

    /// Session id stamped on every generated batch
    pub correlation_id: String,

    /// Batches generated and queued by producers
    pub batches_generated: u64,

    pub events_generated: u64,

    pub operations_generated: u64,

    /// Non-fatal anomalies reported by the bus
    pub anomalies: u64,

    pub fatal_anomalies: u64,

    /// Batches still queued when the run ended
    pub left_queued: usize,

    /// Total duration of the run
    pub duration: Duration,

    /// Dispatcher counters and summary
    pub report: DispatchReport,
}

impl SimulationStats {
    /// Records generated per second
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            (self.events_generated + self.operations_generated) as f64 / secs
        } else {
            0.0
        }
    }

    /// Share of generated records that reached the transport, as percentage
    pub fn delivery_rate(&self) -> f64 {
        let generated = self.events_generated + self.operations_generated;
        if generated > 0 {
            (self.report.summary.records_delivered as f64 / generated as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        let metrics = &self.report.metrics;
        let summary = &self.report.summary;

        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Simulation Statistics                     ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Producers");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Producers: {}", self.producers);
        println!("   ├─ Session: {}", self.correlation_id);
        println!("   ├─ Batches generated: {}", self.batches_generated);
        println!("   ├─ Events generated: {}", self.events_generated);
        println!("   ├─ Operations generated: {}", self.operations_generated);
        println!("   └─ Records/s: {:.2}", self.throughput());

        println!("\n📤 Dispatch");
        println!("   ├─ Batches sent: {}", metrics.sent_count);
        println!("   ├─ Failed attempts: {}", metrics.failure_count);
        println!("   ├─ Merged consolidations: {}", metrics.merged_count);
        println!("   ├─ Skipped ticks: {}", metrics.skipped_count);
        println!("   ├─ Given up: {}", metrics.given_up_count);
        println!("   ├─ Records delivered: {}", summary.records_delivered);
        println!("   ├─ Delivery rate: {:.2}%", self.delivery_rate());
        println!("   └─ Left queued: {}", self.left_queued);

        println!("\n📈 Batch Sizes");
        println!("   ├─ Records per batch: {}", summary.batch_size);
        println!("   └─ Retries before success: {}", summary.retries);

        if self.anomalies > 0 || self.fatal_anomalies > 0 {
            println!("\n⚠️  Anomalies");
            println!("   ├─ Non-fatal: {}", self.anomalies);
            println!("   └─ Fatal: {}", self.fatal_anomalies);
        }

        if self.report.gave_up {
            println!("\n✗ Dispatcher gave up after reaching the retry limit");
        }

        println!();
    }
}
