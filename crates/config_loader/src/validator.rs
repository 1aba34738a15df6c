//! Config validation
//!
//! Rules:
//! - tracker.app_id / tracker.endpoint non-empty
//! - dispatch.interval_ms > 0
//! - dispatch.max_retries >= 1
//! - file transport has a non-empty path

use contracts::{ContractError, TrackerConfig, TransportKind};

/// Validate a TrackerConfig
///
/// Returns the first error encountered.
pub fn validate(config: &TrackerConfig) -> Result<(), ContractError> {
    validate_tracker(config)?;
    validate_dispatch(config)?;
    validate_transport(config)?;
    Ok(())
}

fn validate_tracker(config: &TrackerConfig) -> Result<(), ContractError> {
    if config.tracker.app_id.trim().is_empty() {
        return Err(ContractError::config_validation(
            "tracker.app_id",
            "app_id cannot be empty",
        ));
    }
    if config.tracker.endpoint.trim().is_empty() {
        return Err(ContractError::config_validation(
            "tracker.endpoint",
            "endpoint cannot be empty",
        ));
    }
    Ok(())
}

fn validate_dispatch(config: &TrackerConfig) -> Result<(), ContractError> {
    let dispatch = &config.dispatch;
    if dispatch.interval_ms == 0 {
        return Err(ContractError::config_validation(
            "dispatch.interval_ms",
            "interval_ms must be > 0",
        ));
    }
    if dispatch.max_retries == 0 {
        return Err(ContractError::config_validation(
            "dispatch.max_retries",
            "max_retries must be >= 1",
        ));
    }
    Ok(())
}

fn validate_transport(config: &TrackerConfig) -> Result<(), ContractError> {
    let transport = &config.transport;
    if transport.kind == TransportKind::File {
        let missing = transport
            .path
            .as_ref()
            .is_none_or(|p| p.as_os_str().is_empty());
        if missing {
            return Err(ContractError::config_validation(
                "transport.path",
                "file transport requires a path",
            ));
        }
    }
    Ok(())
}
