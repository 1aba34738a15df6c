//! Layered error definitions
//!
//! Categorized by source: config / transport

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Transport Errors =====
    /// Transport send error
    #[error("transport '{transport}' send error for batch {number}: {message}")]
    TransportSend {
        transport: String,
        number: u64,
        message: String,
    },

    /// Transport unavailable (closed or never opened)
    #[error("transport '{transport}' unavailable: {message}")]
    TransportUnavailable { transport: String, message: String },

    /// Batch encoding error
    #[error("encode error: {0}")]
    Encode(String),

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create transport send error
    pub fn transport_send(
        transport: impl Into<String>,
        number: u64,
        message: impl Into<String>,
    ) -> Self {
        Self::TransportSend {
            transport: transport.into(),
            number,
            message: message.into(),
        }
    }

    /// Create transport unavailable error
    pub fn transport_unavailable(
        transport: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::TransportUnavailable {
            transport: transport.into(),
            message: message.into(),
        }
    }
}
