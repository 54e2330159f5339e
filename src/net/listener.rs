//! TCP listener binding.
//!
//! # Responsibilities
//! - Resolve and bind a service's listen address
//! - Hand a non-blocking std listener to the HTTP server
//! - Classify bind and serve failures per service

use std::net::{SocketAddr, TcpListener};

/// Error type for listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The accept loop terminated with an error.
    #[error("Listener failed: {0}")]
    Serve(#[source] std::io::Error),
}

/// Bind `address` (e.g. "127.0.0.1:8080", "localhost:0").
pub fn bind(address: &str) -> Result<TcpListener, ListenerError> {
    let bind_err = |source| ListenerError::Bind {
        address: address.to_string(),
        source,
    };

    let listener = TcpListener::bind(address).map_err(bind_err)?;
    listener.set_nonblocking(true).map_err(bind_err)?;

    let local_addr: SocketAddr = listener.local_addr().map_err(bind_err)?;
    tracing::info!(address = %local_addr, "Listener bound");

    Ok(listener)
}
