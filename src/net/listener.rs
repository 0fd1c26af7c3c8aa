//! TCP listener bound to the first free port of a range.
//!
//! # Responsibilities
//! - Try candidate ports in ascending order
//! - Skip ports already in use; fail on any other bind error
//! - Log the bound address

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::ops::RangeInclusive;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Host did not form a valid socket address.
    #[error("Invalid bind address `{0}`")]
    Address(String),
    /// Every port in the range is taken.
    #[error("No free port in {start}-{end}")]
    Exhausted { start: u16, end: u16 },
    /// Failed to bind for a reason other than the port being taken.
    #[error("Failed to bind: {0}")]
    Bind(#[from] std::io::Error),
}

/// Bind the first available port of `ports` on `host`.
pub async fn bind_first_available(
    host: &str,
    ports: RangeInclusive<u16>,
) -> Result<TcpListener, ListenerError> {
    let (start, end) = (*ports.start(), *ports.end());

    for port in ports {
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .map_err(|_| ListenerError::Address(host.to_string()))?;

        match TcpListener::bind(addr).await {
            Ok(listener) => {
                tracing::info!(address = %listener.local_addr()?, "Listener bound");
                return Ok(listener);
            }
            Err(e) if e.kind() == ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port in use, trying next");
            }
            Err(e) => return Err(ListenerError::Bind(e)),
        }
    }

    Err(ListenerError::Exhausted { start, end })
}

/// Bind using the listener section of the config.
pub async fn bind(config: &ListenerConfig) -> Result<TcpListener, ListenerError> {
    bind_first_available(&config.host, config.port_range_start..=config.port_range_end).await
}
