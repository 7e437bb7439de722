//! In-flight request tracking.
//!
//! # Responsibilities
//! - Count requests currently being served
//! - Let the drain path wait until that count reaches zero
//! - Generate unique request sequence numbers for tracing

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Global atomic counter for in-flight IDs.
/// Relaxed ordering is enough: only uniqueness is needed.
static IN_FLIGHT_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a tracked unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InFlightId(u64);

impl InFlightId {
    /// Allocate the next unique ID.
    pub fn new() -> Self {
        Self(IN_FLIGHT_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for InFlightId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InFlightId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

#[derive(Debug, Default)]
struct TrackerInner {
    active: AtomicU64,
    idle: Notify,
}

/// Tracks in-flight work for graceful shutdown.
#[derive(Debug, Clone, Default)]
pub struct InFlightTracker {
    inner: Arc<TrackerInner>,
}

impl InFlightTracker {
    /// Create a new in-flight tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record new in-flight work. Returns a guard that decrements on drop.
    pub fn track(&self) -> InFlightGuard {
        let active = self.inner.active.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::gauge!("harness_in_flight_requests").set(active as f64);
        InFlightGuard {
            inner: Arc::clone(&self.inner),
            id: InFlightId::new(),
        }
    }

    /// Current in-flight count.
    pub fn active_count(&self) -> u64 {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Wait until nothing is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            // Register before checking so a release between the check and
            // the await is not missed.
            notified.as_mut().enable();

            if self.active_count() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Guard for one unit of in-flight work.
#[derive(Debug)]
pub struct InFlightGuard {
    inner: Arc<TrackerInner>,
    id: InFlightId,
}

impl InFlightGuard {
    /// ID of the tracked work, for logging.
    pub fn id(&self) -> InFlightId {
        self.id
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let remaining = self.inner.active.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::gauge!("harness_in_flight_requests").set(remaining as f64);
        if remaining == 0 {
            self.inner.idle.notify_waiters();
        }
        tracing::trace!(id = %self.id, remaining, "In-flight work finished");
    }
}
