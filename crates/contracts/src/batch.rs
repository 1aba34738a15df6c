//! Batch - the single unit handed to a transport
//!
//! Everything except `retries` is fixed at construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DeviceInformation, Event, Operation};

/// Consolidated unit of telemetry content ready for one backend submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    /// Device snapshot at generation time (absent until the host sets it)
    device_information: Option<DeviceInformation>,

    /// Generation time
    timestamp: DateTime<Utc>,

    /// Sequence number (strictly increasing, never reused)
    number: u64,

    /// Session correlation id
    correlation_id: String,

    /// Events in arrival order
    events: Vec<Event>,

    /// Operations in arrival order
    operations: Vec<Operation>,

    /// Consecutive failures at the time of the last dispatch attempt
    retries: u32,
}

impl Batch {
    /// Assemble a batch. Sequence numbers are assigned by the batch bus.
    pub fn new(
        device_information: Option<DeviceInformation>,
        timestamp: DateTime<Utc>,
        number: u64,
        correlation_id: impl Into<String>,
        events: Vec<Event>,
        operations: Vec<Operation>,
    ) -> Self {
        Self {
            device_information,
            timestamp,
            number,
            correlation_id: correlation_id.into(),
            events,
            operations,
            retries: 0,
        }
    }

    pub fn device_information(&self) -> Option<&DeviceInformation> {
        self.device_information.as_ref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Stamp the retry count before a dispatch attempt
    pub fn set_retries(&mut self, retries: u32) {
        self.retries = retries;
    }

    /// True when the batch carries neither events nor operations
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.operations.is_empty()
    }

    /// Total number of records (events + operations)
    pub fn record_count(&self) -> usize {
        self.events.len() + self.operations.len()
    }

    /// Consume the batch, keeping only its records
    pub fn into_records(self) -> (Vec<Event>, Vec<Operation>) {
        (self.events, self.operations)
    }
}
