//! Error reporter implementations

use std::sync::{Mutex, PoisonError};

use contracts::ErrorReporter;
use tracing::{error, warn};

/// Forwards reports to tracing (`warn` for non-fatal, `error` for fatal)
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, message: &str, fatal: bool) {
        observability::record_anomaly(fatal);
        if fatal {
            error!(fatal, "{message}");
        } else {
            warn!(fatal, "{message}");
        }
    }
}

/// A single captured report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub message: String,
    pub fatal: bool,
}

/// Keeps every report in memory
#[derive(Debug, Default)]
pub struct CollectingReporter {
    reports: Mutex<Vec<Report>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the captured reports
    pub fn reports(&self) -> Vec<Report> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ErrorReporter for CollectingReporter {
    fn report(&self, message: &str, fatal: bool) {
        observability::record_anomaly(fatal);
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Report {
                message: message.to_string(),
                fatal,
            });
    }
}
