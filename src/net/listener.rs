//! Listener binding and the serve-handle capability.
//!
//! # Responsibilities
//! - Bind the configured address (failure is fatal, never retried)
//! - Describe what the shutdown path may do to a running accept loop

use std::future::Future;
use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The configured address is not a socket address.
    #[error("invalid bind address '{address}': {source}")]
    Address {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// Failed to bind to address.
    #[error("failed to bind: {0}")]
    Bind(#[source] std::io::Error),
}

/// Bind a TCP listener on `address`.
///
/// Once this returns the socket is accepting into the kernel backlog, so a
/// health check issued afterwards can connect even before the serve loop
/// first polls `accept`.
pub async fn bind(address: &str) -> Result<TcpListener, ListenerError> {
    let addr: SocketAddr = address.parse().map_err(|source| ListenerError::Address {
        address: address.to_string(),
        source,
    })?;

    let listener = TcpListener::bind(addr).await.map_err(ListenerError::Bind)?;
    let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;

    tracing::info!(address = %local_addr, "Listener bound");
    Ok(listener)
}

/// Control surface of a running accept/serve loop.
///
/// Only the shutdown coordinator drives these methods.
pub trait ServeHandle: Send {
    /// Stop accepting new connections. In-flight work continues.
    fn stop_accepting(&mut self);

    /// Resolves once every accepted connection has finished.
    fn drained(&mut self) -> impl Future<Output = ()> + Send + '_;

    /// Abort the serve loop and whatever is still in flight.
    fn force_close(&mut self);
}
