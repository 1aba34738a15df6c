//! BatchBus - queue of batches plus the dispatch state of the in-flight batch.
//!
//! Two locks:
//! - `queue` guards the FIFO of not-yet-dispatched batches
//! - `state` guards the in-flight batch, failure counter and awaiting flag
//!
//! Lock order is always `queue` then `state`. Reporter callbacks run with no
//! lock held.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use chrono::Utc;
use contracts::{Batch, DeviceInformation, ErrorReporter, Event, Operation};
use tracing::{debug, instrument, warn};

use crate::error::BatchBusError;
use crate::merge::merge_records;
use crate::reporter::TracingReporter;
use crate::sequence::{AtomicSequence, SequenceSource};

const EMPTY_BATCH_REPORT: &str =
    "Generated a batch without events or operations; batches should only be requested with content";

/// Outcome of [`BatchBus::set_pending_batch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consolidation {
    /// Queue was empty, nothing changed
    Empty,
    /// The only queued batch became the in-flight batch
    Promoted { number: u64 },
    /// Several queued batches were merged into a new in-flight batch
    Merged { number: u64, sources: usize },
    /// A batch is already in flight; queue left untouched
    Busy { number: u64 },
}

impl Consolidation {
    /// Label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Promoted { .. } => "promoted",
            Self::Merged { .. } => "merged",
            Self::Busy { .. } => "busy",
        }
    }

    /// Sequence number of the in-flight batch, if any
    pub fn number(&self) -> Option<u64> {
        match self {
            Self::Empty => None,
            Self::Promoted { number } | Self::Merged { number, .. } | Self::Busy { number } => {
                Some(*number)
            }
        }
    }
}

#[derive(Debug, Default)]
struct DispatchState {
    /// Batch currently awaiting acknowledgement
    pending: Option<Batch>,
    /// Consecutive failures since the last success
    retries: u32,
    /// A dispatch attempt is outstanding
    awaiting_callback: bool,
}

/// Batch aggregation and dispatch-state coordinator
///
/// Producers call [`generate_batch`](Self::generate_batch) and
/// [`add`](Self::add) from any thread; a single dispatcher drives
/// consolidation and the success/failure transitions.
pub struct BatchBus {
    device_information: OnceLock<DeviceInformation>,
    queue: Mutex<Vec<Batch>>,
    state: Mutex<DispatchState>,
    sequence: Arc<dyn SequenceSource>,
    reporter: Arc<dyn ErrorReporter>,
}

impl fmt::Debug for BatchBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let queued = self.queued_len();
        let state = self.lock_state();
        f.debug_struct("BatchBus")
            .field("queued", &queued)
            .field("pending", &state.pending.as_ref().map(Batch::number))
            .field("retries", &state.retries)
            .field("awaiting_callback", &state.awaiting_callback)
            .finish()
    }
}

impl Default for BatchBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`BatchBus`] with injectable collaborators
#[derive(Default)]
pub struct BatchBusBuilder {
    sequence: Option<Arc<dyn SequenceSource>>,
    reporter: Option<Arc<dyn ErrorReporter>>,
    device_information: Option<DeviceInformation>,
}

impl BatchBusBuilder {
    /// Use a custom sequence source (defaults to an [`AtomicSequence`] at 0)
    pub fn sequence(mut self, sequence: Arc<dyn SequenceSource>) -> Self {
        self.sequence = Some(sequence);
        self
    }

    /// Use a custom error reporter (defaults to [`TracingReporter`])
    pub fn reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Preset device information
    pub fn device_information(mut self, info: DeviceInformation) -> Self {
        self.device_information = Some(info);
        self
    }

    pub fn build(self) -> BatchBus {
        let device_information = OnceLock::new();
        if let Some(info) = self.device_information {
            let _ = device_information.set(info);
        }

        BatchBus {
            device_information,
            queue: Mutex::new(Vec::new()),
            state: Mutex::new(DispatchState::default()),
            sequence: self
                .sequence
                .unwrap_or_else(|| Arc::new(AtomicSequence::new())),
            reporter: self.reporter.unwrap_or_else(|| Arc::new(TracingReporter)),
        }
    }
}

impl BatchBus {
    /// Create a bus with default collaborators
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> BatchBusBuilder {
        BatchBusBuilder::default()
    }

    /// Store device information unless already set (first write wins)
    ///
    /// Returns `true` if this call stored the value.
    pub fn set_device_information(&self, info: DeviceInformation) -> bool {
        let stored = self.device_information.set(info).is_ok();
        if !stored {
            debug!("Device information already set, ignoring");
        }
        stored
    }

    pub fn device_information(&self) -> Option<&DeviceInformation> {
        self.device_information.get()
    }

    /// Materialise records as a new batch with the next sequence number
    ///
    /// Absent inputs count as empty. A batch with no records is still returned,
    /// and reported to the error reporter as non-fatal.
    pub fn generate_batch(
        &self,
        correlation_id: impl Into<String>,
        events: Option<Vec<Event>>,
        operations: Option<Vec<Operation>>,
    ) -> Batch {
        let batch = self.assemble(
            correlation_id.into(),
            events.unwrap_or_default(),
            operations.unwrap_or_default(),
        );
        if batch.is_empty() {
            self.report_empty(&batch);
        }
        batch
    }

    /// Append a batch to the tail of the queue
    pub fn add(&self, batch: Batch) {
        let number = batch.number();
        let depth = {
            let mut queue = self.lock_queue();
            queue.push(batch);
            queue.len()
        };
        observability::record_batch_enqueued(depth);
        debug!(number, depth, "Added batch to bus");
    }

    /// Drop every queued batch; the in-flight batch is untouched
    pub fn clear_batches(&self) {
        let cleared = std::mem::take(&mut *self.lock_queue()).len();
        debug!(cleared, "Cleared queued batches");
    }

    /// Forget the in-flight batch; failure counter and queue are untouched
    pub fn clear_pending(&self) {
        let mut state = self.lock_state();
        if let Some(batch) = state.pending.take() {
            debug!(number = batch.number(), "Cleared pending batch");
        }
        state.awaiting_callback = false;
    }

    /// Whether a dispatch attempt is outstanding
    pub fn awaiting_callback(&self) -> bool {
        self.lock_state().awaiting_callback
    }

    /// Number of queued batches
    pub fn queued_len(&self) -> usize {
        self.lock_queue().len()
    }

    /// Consolidate the queue into the in-flight batch
    ///
    /// One queued batch is promoted as is; several are merged into a fresh
    /// batch carrying the oldest batch's correlation id. The queue is drained
    /// atomically with respect to [`add`](Self::add).
    #[instrument(
        name = "batch_bus_set_pending",
        skip(self),
        fields(queued = tracing::field::Empty)
    )]
    pub fn set_pending_batch(&self) -> Consolidation {
        let mut empty_merge = None;

        let outcome = {
            let mut queue = self.lock_queue();
            let mut state = self.lock_state();
            tracing::Span::current().record("queued", queue.len());

            if let Some(pending) = &state.pending {
                debug!(
                    number = pending.number(),
                    "Batch already in flight, leaving queue untouched"
                );
                Consolidation::Busy {
                    number: pending.number(),
                }
            } else {
                match queue.len() {
                    0 => {
                        debug!("No batches to set as pending");
                        Consolidation::Empty
                    }
                    1 => {
                        let batch = queue.remove(0);
                        let number = batch.number();
                        debug!(number, "Promoting the only queued batch");
                        state.pending = Some(batch);
                        Consolidation::Promoted { number }
                    }
                    sources => {
                        let merged = merge_records(std::mem::take(&mut *queue));
                        let batch =
                            self.assemble(merged.correlation_id, merged.events, merged.operations);
                        let number = batch.number();
                        debug!(number, sources, "Merged queued batches");
                        if batch.is_empty() {
                            empty_merge = Some(batch.clone());
                        }
                        state.pending = Some(batch);
                        Consolidation::Merged { number, sources }
                    }
                }
            }
        };

        if let Some(batch) = empty_merge {
            self.report_empty(&batch);
        }

        let sources = match outcome {
            Consolidation::Merged { sources, .. } => sources,
            Consolidation::Promoted { .. } => 1,
            _ => 0,
        };
        observability::record_consolidation(outcome.kind(), sources);
        outcome
    }

    /// Snapshot of the in-flight batch
    pub fn pending_batch(&self) -> Option<Batch> {
        self.lock_state().pending.clone()
    }

    /// Mark the in-flight batch as being dispatched
    ///
    /// Stamps it with the current failure counter and sets the awaiting flag.
    ///
    /// # Errors
    /// [`BatchBusError::NoPendingBatch`] if nothing is in flight; no state changes.
    pub fn pre_dispatch(&self) -> Result<(), BatchBusError> {
        let mut state = self.lock_state();
        let retries = state.retries;
        let Some(batch) = state.pending.as_mut() else {
            warn!("pre_dispatch called without a pending batch");
            return Err(BatchBusError::NoPendingBatch);
        };
        batch.set_retries(retries);
        let number = batch.number();
        state.awaiting_callback = true;

        debug!(number, retries, "Dispatching batch");
        Ok(())
    }

    /// The backend rejected the in-flight batch; keep it for a retry
    pub fn on_batch_failed(&self) {
        let mut state = self.lock_state();
        if !state.awaiting_callback {
            warn!("Batch failure reported while no dispatch was outstanding");
        }
        state.retries = state.retries.saturating_add(1);
        state.awaiting_callback = false;

        observability::record_retries(state.retries);
        debug!(retries = state.retries, "Last batch failed");
    }

    /// The backend accepted the in-flight batch
    pub fn on_batch_succeeded(&self) {
        let mut state = self.lock_state();
        if !state.awaiting_callback {
            warn!("Batch success reported while no dispatch was outstanding");
        }
        let number = state.pending.take().map(|b| b.number());
        state.retries = 0;
        state.awaiting_callback = false;

        observability::record_retries(0);
        debug!(?number, "Last batch succeeded");
    }

    /// Zero the failure counter after the in-flight batch was abandoned
    ///
    /// Only meaningful once `clear_pending` has dropped the batch; the next
    /// consolidated batch then starts from a clean counter.
    pub fn reset_retries(&self) {
        let mut state = self.lock_state();
        let previous = std::mem::take(&mut state.retries);
        observability::record_retries(0);
        debug!(previous, "Reset failure counter");
    }

    /// Consecutive failures since the last success
    pub fn retries(&self) -> u32 {
        self.lock_state().retries
    }

    fn assemble(
        &self,
        correlation_id: String,
        events: Vec<Event>,
        operations: Vec<Operation>,
    ) -> Batch {
        let number = self.sequence.next();
        debug!(
            number,
            correlation_id = %correlation_id,
            events = events.len(),
            operations = operations.len(),
            "Generating batch"
        );
        observability::record_batch_generated(events.len(), operations.len());

        Batch::new(
            self.device_information.get().cloned(),
            Utc::now(),
            number,
            correlation_id,
            events,
            operations,
        )
    }

    fn report_empty(&self, batch: &Batch) {
        warn!(number = batch.number(), "Generated an empty batch");
        self.reporter.report(EMPTY_BATCH_REPORT, false);
    }

    fn lock_queue(&self) -> MutexGuard<'_, Vec<Batch>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_state(&self) -> MutexGuard<'_, DispatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::CollectingReporter;
    use std::collections::HashSet;
    use std::thread;

    fn events(names: &[&str]) -> Option<Vec<Event>> {
        Some(names.iter().map(|n| Event::new(*n)).collect())
    }

    fn event_names(batch: &Batch) -> Vec<String> {
        batch.events().iter().map(|e| e.name.clone()).collect()
    }

    fn bus_with_reporter() -> (BatchBus, Arc<CollectingReporter>) {
        let reporter = Arc::new(CollectingReporter::new());
        let bus = BatchBus::builder().reporter(reporter.clone()).build();
        (bus, reporter)
    }

    fn device(model: &str) -> DeviceInformation {
        DeviceInformation {
            os_name: "android".into(),
            os_version: "14".into(),
            model: model.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_sequence_numbers_strictly_increase_including_merges() {
        let bus = BatchBus::new();
        let a = bus.generate_batch("s", events(&["a"]), None);
        let b = bus.generate_batch("s", events(&["b"]), None);
        bus.add(a.clone());
        bus.add(b.clone());
        bus.set_pending_batch();
        let merged = bus.pending_batch().unwrap();
        let c = bus.generate_batch("s", events(&["c"]), None);

        let numbers = [a.number(), b.number(), merged.number(), c.number()];
        assert_eq!(numbers, [0, 1, 2, 3]);
    }

    #[test]
    fn test_injected_sequence_source() {
        let bus = BatchBus::builder()
            .sequence(Arc::new(AtomicSequence::starting_at(100)))
            .build();
        assert_eq!(bus.generate_batch("s", events(&["a"]), None).number(), 100);
        assert_eq!(bus.generate_batch("s", events(&["b"]), None).number(), 101);
    }

    #[test]
    fn test_merge_events_and_operations() {
        let bus = BatchBus::new();
        bus.add(bus.generate_batch("s", events(&["a", "b"]), None));
        bus.add(bus.generate_batch("s", events(&["c"]), None));
        bus.add(bus.generate_batch("s", None, Some(vec![Operation::new(1, "x")])));

        let outcome = bus.set_pending_batch();
        assert!(matches!(outcome, Consolidation::Merged { sources: 3, .. }));

        let pending = bus.pending_batch().unwrap();
        assert_eq!(event_names(&pending), vec!["a", "b", "c"]);
        assert_eq!(pending.operations().len(), 1);
        assert_eq!(pending.operations()[0].name, "x");
        assert_eq!(bus.queued_len(), 0);
    }

    #[test]
    fn test_set_pending_on_empty_queue_is_noop() {
        let bus = BatchBus::new();
        assert_eq!(bus.set_pending_batch(), Consolidation::Empty);
        assert!(bus.pending_batch().is_none());
    }

    #[test]
    fn test_set_pending_on_empty_queue_keeps_in_flight_batch() {
        let bus = BatchBus::new();
        bus.add(bus.generate_batch("s", events(&["a"]), None));
        bus.set_pending_batch();
        bus.pre_dispatch().unwrap();
        bus.on_batch_failed();

        let before = bus.pending_batch().unwrap();
        assert!(matches!(
            bus.set_pending_batch(),
            Consolidation::Busy { .. }
        ));
        assert_eq!(bus.pending_batch().unwrap(), before);
    }

    #[test]
    fn test_single_batch_is_promoted_unchanged() {
        let bus = BatchBus::new();
        let batch = bus.generate_batch("s", events(&["a", "b"]), None);
        bus.add(batch.clone());

        assert_eq!(
            bus.set_pending_batch(),
            Consolidation::Promoted {
                number: batch.number()
            }
        );
        assert_eq!(bus.pending_batch().unwrap(), batch);
        assert_eq!(bus.queued_len(), 0);
    }

    #[test]
    fn test_merged_batch_takes_oldest_correlation_id() {
        let bus = BatchBus::new();
        bus.add(bus.generate_batch("session-old", events(&["a"]), None));
        bus.add(bus.generate_batch("session-new", events(&["b"]), None));
        bus.set_pending_batch();
        assert_eq!(bus.pending_batch().unwrap().correlation_id(), "session-old");
    }

    #[test]
    fn test_busy_leaves_queue_intact() {
        let bus = BatchBus::new();
        bus.add(bus.generate_batch("s", events(&["a"]), None));
        bus.set_pending_batch();
        bus.add(bus.generate_batch("s", events(&["b"]), None));

        assert!(matches!(bus.set_pending_batch(), Consolidation::Busy { .. }));
        assert_eq!(bus.queued_len(), 1);

        bus.pre_dispatch().unwrap();
        bus.on_batch_succeeded();
        assert!(matches!(
            bus.set_pending_batch(),
            Consolidation::Promoted { .. }
        ));
        assert_eq!(event_names(&bus.pending_batch().unwrap()), vec!["b"]);
    }

    #[test]
    fn test_success_clears_pending_and_retries() {
        let bus = BatchBus::new();
        bus.add(bus.generate_batch("s", events(&["a"]), None));
        bus.set_pending_batch();
        bus.pre_dispatch().unwrap();
        bus.on_batch_failed();
        bus.pre_dispatch().unwrap();
        bus.on_batch_succeeded();

        assert!(bus.pending_batch().is_none());
        assert_eq!(bus.retries(), 0);
        assert!(!bus.awaiting_callback());
    }

    #[test]
    fn test_consecutive_failures_keep_content() {
        let bus = BatchBus::new();
        bus.add(bus.generate_batch("s", events(&["a", "b"]), None));
        bus.set_pending_batch();
        let original = bus.pending_batch().unwrap();

        for k in 1..=3u32 {
            bus.pre_dispatch().unwrap();
            assert!(bus.awaiting_callback());
            bus.on_batch_failed();
            assert!(!bus.awaiting_callback());
            assert_eq!(bus.retries(), k);

            let pending = bus.pending_batch().unwrap();
            assert_eq!(pending.number(), original.number());
            assert_eq!(pending.events(), original.events());
            // stamp reflects the count at the last pre_dispatch
            assert_eq!(pending.retries(), k - 1);
        }

        bus.pre_dispatch().unwrap();
        assert_eq!(bus.pending_batch().unwrap().retries(), 3);
    }

    #[test]
    fn test_device_information_first_write_wins() {
        let bus = BatchBus::new();
        assert!(bus.set_device_information(device("A")));
        assert!(!bus.set_device_information(device("B")));
        assert_eq!(bus.device_information().unwrap().model, "A");

        let batch = bus.generate_batch("s", events(&["a"]), None);
        assert_eq!(batch.device_information().unwrap().model, "A");
    }

    #[test]
    fn test_builder_device_information_is_first_write() {
        let bus = BatchBus::builder().device_information(device("A")).build();
        assert!(!bus.set_device_information(device("B")));
        assert_eq!(bus.device_information().unwrap().model, "A");
    }

    #[test]
    fn test_empty_batch_reports_once() {
        let (bus, reporter) = bus_with_reporter();
        let batch = bus.generate_batch("s", None, Some(Vec::new()));

        assert!(batch.is_empty());
        let reports = reporter.reports();
        assert_eq!(reports.len(), 1);
        assert!(!reports[0].fatal);
    }

    #[test]
    fn test_non_empty_batch_does_not_report() {
        let (bus, reporter) = bus_with_reporter();
        bus.generate_batch("s", events(&["a"]), None);
        bus.generate_batch("s", None, Some(vec![Operation::new(1, "x")]));
        assert!(reporter.is_empty());
    }

    #[test]
    fn test_merge_of_empty_batches_reports() {
        let (bus, reporter) = bus_with_reporter();
        bus.add(bus.generate_batch("s", None, None));
        bus.add(bus.generate_batch("s", None, None));
        assert_eq!(reporter.len(), 2);

        bus.set_pending_batch();
        assert_eq!(reporter.len(), 3);
        assert!(bus.pending_batch().unwrap().is_empty());
    }

    #[test]
    fn test_pre_dispatch_without_pending_is_rejected() {
        let bus = BatchBus::new();
        assert_eq!(bus.pre_dispatch(), Err(BatchBusError::NoPendingBatch));
        assert!(!bus.awaiting_callback());
    }

    #[test]
    fn test_clear_batches_keeps_pending() {
        let bus = BatchBus::new();
        bus.add(bus.generate_batch("s", events(&["a"]), None));
        bus.set_pending_batch();
        bus.add(bus.generate_batch("s", events(&["b"]), None));

        bus.clear_batches();
        assert_eq!(bus.queued_len(), 0);
        assert!(bus.pending_batch().is_some());
    }

    #[test]
    fn test_clear_pending_keeps_retries_and_queue() {
        let bus = BatchBus::new();
        bus.add(bus.generate_batch("s", events(&["a"]), None));
        bus.set_pending_batch();
        bus.pre_dispatch().unwrap();
        bus.on_batch_failed();
        bus.add(bus.generate_batch("s", events(&["b"]), None));

        bus.clear_pending();
        assert!(bus.pending_batch().is_none());
        assert_eq!(bus.retries(), 1);
        assert_eq!(bus.queued_len(), 1);
    }

    #[test]
    fn test_reset_retries_after_abandoning_batch() {
        let bus = BatchBus::new();
        bus.add(bus.generate_batch("s", Some(vec![Event::new("a")]), None));
        bus.set_pending_batch();
        bus.pre_dispatch().unwrap();
        bus.on_batch_failed();
        assert_eq!(bus.retries(), 1);

        bus.clear_pending();
        bus.reset_retries();
        assert_eq!(bus.retries(), 0);

        bus.add(bus.generate_batch("s", Some(vec![Event::new("b")]), None));
        bus.set_pending_batch();
        bus.pre_dispatch().unwrap();
        assert_eq!(bus.pending_batch().unwrap().retries(), 0);
    }

    #[test]
    fn test_concurrent_add_then_consolidate() {
        let bus = Arc::new(BatchBus::new());
        let producers = 8;
        let per_producer = 50;

        let handles: Vec<_> = (0..producers)
            .map(|p| {
                let bus = Arc::clone(&bus);
                thread::spawn(move || {
                    for i in 0..per_producer {
                        let name = format!("p{p}-e{i}");
                        bus.add(bus.generate_batch("s", Some(vec![Event::new(name)]), None));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(matches!(
            bus.set_pending_batch(),
            Consolidation::Merged { sources, .. } if sources == producers * per_producer
        ));

        let pending = bus.pending_batch().unwrap();
        let names: HashSet<_> = pending.events().iter().map(|e| e.name.clone()).collect();
        assert_eq!(pending.events().len(), producers * per_producer);
        assert_eq!(names.len(), producers * per_producer);

        // per-producer order survives the merge
        for p in 0..producers {
            let prefix = format!("p{p}-");
            let own: Vec<_> = pending
                .events()
                .iter()
                .filter(|e| e.name.starts_with(&prefix))
                .map(|e| e.name.clone())
                .collect();
            let expected: Vec<_> = (0..per_producer).map(|i| format!("p{p}-e{i}")).collect();
            assert_eq!(own, expected);
        }
    }

    #[test]
    fn test_add_racing_with_consolidation_loses_nothing() {
        let bus = Arc::new(BatchBus::new());
        let total = 2000;

        let producer = {
            let bus = Arc::clone(&bus);
            thread::spawn(move || {
                for i in 0..total {
                    bus.add(bus.generate_batch("s", Some(vec![Event::new(i.to_string())]), None));
                }
            })
        };

        let mut delivered = Vec::new();
        loop {
            let done = producer.is_finished();
            if bus.set_pending_batch().number().is_some() {
                bus.pre_dispatch().unwrap();
                let batch = bus.pending_batch().unwrap();
                delivered.extend(batch.events().iter().map(|e| e.name.clone()));
                bus.on_batch_succeeded();
            }
            if done && bus.queued_len() == 0 {
                break;
            }
        }
        producer.join().unwrap();

        let expected: Vec<_> = (0..total).map(|i| i.to_string()).collect();
        assert_eq!(delivered, expected);
    }
}
