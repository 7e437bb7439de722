//! Termination signal sources.
//!
//! # Responsibilities
//! - Register SIGINT/SIGTERM handlers via Tokio (async-safe)
//! - Translate OS signals into `SignalKind` events
//! - Provide a synthetic source so the shutdown path can be driven in tests
//!
//! # Design Decisions
//! - Sources report every delivery; debouncing belongs to the coordinator
//! - A source that returns `None` has closed and will never fire again

use std::fmt;
use std::future::Future;

use serde::Serialize;
use tokio::sync::mpsc;

/// Kind of termination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    /// SIGINT / Ctrl+C.
    Interrupt,
    /// SIGTERM.
    Terminate,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalKind::Interrupt => f.write_str("SIGINT"),
            SignalKind::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Something that delivers termination signals.
pub trait SignalSource: Send {
    /// Wait for the next signal. `None` means the source has closed.
    fn recv(&mut self) -> impl Future<Output = Option<SignalKind>> + Send + '_;
}

/// SIGINT and SIGTERM from the operating system.
#[cfg(unix)]
pub struct OsSignals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl OsSignals {
    /// Register the handlers. Must be called inside a Tokio runtime.
    pub fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind as UnixSignal};

        Ok(Self {
            interrupt: signal(UnixSignal::interrupt())?,
            terminate: signal(UnixSignal::terminate())?,
        })
    }
}

#[cfg(unix)]
impl SignalSource for OsSignals {
    fn recv(&mut self) -> impl Future<Output = Option<SignalKind>> + Send + '_ {
        async move {
            tokio::select! {
                received = self.interrupt.recv() => received.map(|()| SignalKind::Interrupt),
                received = self.terminate.recv() => received.map(|()| SignalKind::Terminate),
            }
        }
    }
}

/// Ctrl+C on platforms without Unix signals.
#[cfg(not(unix))]
pub struct OsSignals;

#[cfg(not(unix))]
impl OsSignals {
    /// Register the Ctrl+C handler.
    pub fn install() -> std::io::Result<Self> {
        Ok(Self)
    }
}

#[cfg(not(unix))]
impl SignalSource for OsSignals {
    fn recv(&mut self) -> impl Future<Output = Option<SignalKind>> + Send + '_ {
        async move {
            tokio::signal::ctrl_c()
                .await
                .ok()
                .map(|()| SignalKind::Interrupt)
        }
    }
}

/// Create a synthetic signal source and the trigger that feeds it.
pub fn synthetic() -> (SignalTrigger, SyntheticSignals) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SignalTrigger { tx }, SyntheticSignals { rx })
}

/// Sending half of a synthetic signal source.
#[derive(Debug, Clone)]
pub struct SignalTrigger {
    tx: mpsc::UnboundedSender<SignalKind>,
}

impl SignalTrigger {
    /// Deliver a signal. Returns `false` if the source was dropped.
    pub fn send(&self, kind: SignalKind) -> bool {
        self.tx.send(kind).is_ok()
    }
}

/// Receiving half of a synthetic signal source.
#[derive(Debug)]
pub struct SyntheticSignals {
    rx: mpsc::UnboundedReceiver<SignalKind>,
}

impl SignalSource for SyntheticSignals {
    fn recv(&mut self) -> impl Future<Output = Option<SignalKind>> + Send + '_ {
        self.rx.recv()
    }
}
