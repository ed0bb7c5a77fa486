//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, addresses parse)
//! - Ensure every proxy command is non-empty
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ConductorConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::ConductorConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0}: command must not be empty")]
    EmptyCommand(&'static str),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("paths.conf_dir and paths.proxy_dir must differ")]
    SharedDirectory,

    #[error("api.api_key must not be empty when set")]
    EmptyApiKey,
}

pub fn validate_config(config: &ConductorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    let commands = [
        ("proxy.start_command", &config.proxy.start_command),
        ("proxy.validate_command", &config.proxy.validate_command),
        ("proxy.reload_command", &config.proxy.reload_command),
        ("proxy.kill_command", &config.proxy.kill_command),
    ];
    for (field, argv) in commands {
        if argv.first().map_or(true, |program| program.is_empty()) {
            errors.push(ValidationError::EmptyCommand(field));
        }
    }

    if config.reload_schedule.enabled && config.reload_schedule.interval_secs == 0 {
        errors.push(ValidationError::ZeroDuration("reload_schedule.interval_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroDuration("timeouts.request_secs"));
    }
    if config.paths.conf_dir == config.paths.proxy_dir {
        errors.push(ValidationError::SharedDirectory);
    }
    if matches!(config.api.api_key.as_deref(), Some("")) {
        errors.push(ValidationError::EmptyApiKey);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
