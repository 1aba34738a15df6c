//! Instrumentation records
//!
//! `Event` and `Operation` are kept in separate ordered sequences inside a
//! `Batch` and are never merged with each other.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-form instrumentation record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event name / label
    pub name: String,

    /// Optional associated value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Creation time
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Create an event without a value, stamped now
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            timestamp: Utc::now(),
        }
    }

    /// Create an event carrying a value, stamped now
    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            timestamp: Utc::now(),
        }
    }
}

/// Operation record (e.g. a funnel step or conversion)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Operation code
    pub code: i32,

    /// Operation name
    pub name: String,

    /// Optional associated value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Creation time
    pub timestamp: DateTime<Utc>,
}

impl Operation {
    /// Create an operation stamped now
    pub fn new(code: i32, name: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
            value: None,
            timestamp: Utc::now(),
        }
    }

    /// Create an operation carrying a value, stamped now
    pub fn with_value(code: i32, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
            value: Some(value.into()),
            timestamp: Utc::now(),
        }
    }
}
