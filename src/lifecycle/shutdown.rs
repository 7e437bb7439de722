//! Shutdown coordination.
//!
//! # Sequence
//! ```text
//! signal observed → stop accepting → drain window → clean stop | forced close
//! ```
//!
//! # Design Decisions
//! - The first signal is latched; deliveries queued before drain are discarded
//! - The drain races completion, the deadline and the next signal
//! - A signal during drain escalates straight to forced close
//! - Bounded shutdown latency wins over slow clients (long-lived streams)

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::error::{EXIT_CLEAN, EXIT_FORCED_DRAIN};
use crate::lifecycle::signals::{SignalKind, SignalSource};
use crate::lifecycle::state::Stamp;
use crate::net::listener::ServeHandle;

/// A termination request observed by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownRequest {
    pub kind: SignalKind,
    pub observed_at: Stamp,
}

/// Why a drain ended by force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ForceReason {
    /// In-flight work outlived the drain deadline.
    DeadlineElapsed,
    /// Another termination signal arrived while draining.
    Escalated,
}

/// Result of `drain_and_stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum DrainOutcome {
    /// All in-flight work finished before the deadline.
    Clean,
    /// The listener was closed with work still outstanding.
    Forced(ForceReason),
}

impl DrainOutcome {
    /// Whether all in-flight work finished.
    pub fn is_clean(&self) -> bool {
        matches!(self, DrainOutcome::Clean)
    }

    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> u8 {
        match self {
            DrainOutcome::Clean => EXIT_CLEAN,
            DrainOutcome::Forced(_) => EXIT_FORCED_DRAIN,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            DrainOutcome::Clean => "clean",
            DrainOutcome::Forced(ForceReason::DeadlineElapsed) => "forced_deadline",
            DrainOutcome::Forced(ForceReason::Escalated) => "forced_escalated",
        }
    }
}

impl fmt::Display for DrainOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Waits for termination and drives the listener through drain-and-stop.
pub struct ShutdownCoordinator<S> {
    signals: S,
    request: Option<ShutdownRequest>,
}

impl<S: SignalSource> ShutdownCoordinator<S> {
    /// Create a coordinator listening on `signals`.
    pub fn new(signals: S) -> Self {
        Self {
            signals,
            request: None,
        }
    }

    /// Suspend until a termination signal arrives.
    ///
    /// The first request is latched: later calls return it immediately.
    /// If the source closes without ever firing, this never resolves.
    pub async fn await_signal(&mut self) -> ShutdownRequest {
        if let Some(request) = self.request {
            return request;
        }

        let kind = next_signal(&mut self.signals).await;
        let request = ShutdownRequest {
            kind,
            observed_at: Stamp::now(),
        };
        tracing::info!(signal = %kind, "Received {}, shutting down gracefully", kind);
        self.request = Some(request);
        request
    }

    /// Stop accepting, then wait up to `deadline` for in-flight work.
    ///
    /// Returns within `deadline` (plus scheduling slack) whatever the
    /// listener does.
    pub async fn drain_and_stop<L: ServeHandle>(
        &mut self,
        listener: &mut L,
        deadline: Duration,
    ) -> DrainOutcome {
        listener.stop_accepting();
        let discarded = discard_pending(&mut self.signals).await;
        if discarded > 0 {
            tracing::debug!(discarded, "Ignoring signals delivered before drain started");
        }
        tracing::info!(deadline = ?deadline, "Stopped accepting connections, draining");

        // Completed work wins a tie with the deadline.
        let outcome = tokio::select! {
            biased;
            _ = listener.drained() => DrainOutcome::Clean,
            _ = tokio::time::sleep(deadline) => {
                tracing::warn!(deadline = ?deadline, "Drain deadline elapsed with work still in flight");
                DrainOutcome::Forced(ForceReason::DeadlineElapsed)
            }
            kind = next_signal(&mut self.signals) => {
                tracing::warn!(signal = %kind, "Second signal while draining, forcing stop");
                DrainOutcome::Forced(ForceReason::Escalated)
            }
        };

        if !outcome.is_clean() {
            listener.force_close();
        }

        metrics::counter!("harness_drain_total", "outcome" => outcome.label()).increment(1);
        tracing::info!(outcome = %outcome, "Drain finished");
        outcome
    }
}

/// Next signal from `source`; pends forever once the source has closed.
async fn next_signal<S: SignalSource>(source: &mut S) -> SignalKind {
    match source.recv().await {
        Some(kind) => kind,
        None => std::future::pending().await,
    }
}

/// Drop deliveries already queued, without waiting for new ones.
async fn discard_pending<S: SignalSource>(source: &mut S) -> usize {
    let mut discarded = 0;
    loop {
        tokio::select! {
            biased;
            Some(_) = source.recv() => discarded += 1,
            _ = std::future::ready(()) => return discarded,
        }
    }
}
