//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (port range ordered and non-zero)
//! - Check paths and prefixes have the shape the dispatcher expects

use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener port range {start}-{end} is empty or starts at 0")]
    PortRange { start: u16, end: u16 },

    #[error("reserved prefix `{0}` must start with '/'")]
    ReservedPrefix(String),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("invalid log level `{0}`")]
    LogLevel(String),
}

/// Collect every problem rather than stopping at the first.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let listener = &config.listener;
    if listener.port_range_start == 0 || listener.port_range_start > listener.port_range_end {
        errors.push(ValidationError::PortRange {
            start: listener.port_range_start,
            end: listener.port_range_end,
        });
    }
    if listener.host.trim().is_empty() {
        errors.push(ValidationError::Empty("listener.host"));
    }

    for prefix in &config.dev.reserved_prefixes {
        if !prefix.starts_with('/') {
            errors.push(ValidationError::ReservedPrefix(prefix.clone()));
        }
    }
    if config.dev.server_entry.trim().is_empty() {
        errors.push(ValidationError::Empty("dev.server_entry"));
    }
    if config.prod.server_entry.as_os_str().is_empty() {
        errors.push(ValidationError::Empty("prod.server_entry"));
    }
    if config.prod.node_path.trim().is_empty() {
        errors.push(ValidationError::Empty("prod.node_path"));
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !matches!(level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
        errors.push(ValidationError::LogLevel(config.observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
