//! Status publication for external verification.
//!
//! The supervisor owns the only `StatusBoard` and publishes a fresh
//! immutable `StatusSnapshot` on every change. Readers (`StatusView`, the
//! `/status` and `/health` handlers, tests) load the current snapshot
//! without locking.

use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::health::probe::ReadinessResult;
use crate::lifecycle::shutdown::DrainOutcome;
use crate::lifecycle::state::{LifecycleState, Stamp};

/// Everything the reproductions assert against, frozen at one moment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub pid: u32,
    pub process_started_at: DateTime<Utc>,
    pub ready_at: Option<DateTime<Utc>>,
    pub ready_latency_ms: Option<u64>,
    pub readiness_succeeded: Option<bool>,
    pub readiness_attempts: Option<u32>,
    #[serde(rename = "currentLifecycleState")]
    pub state: LifecycleState,
    pub drain_outcome: Option<DrainOutcome>,
    #[serde(skip)]
    started: Stamp,
}

impl StatusSnapshot {
    fn initial(started: Stamp) -> Self {
        Self {
            pid: std::process::id(),
            process_started_at: started.wall,
            ready_at: None,
            ready_latency_ms: None,
            readiness_succeeded: None,
            readiness_attempts: None,
            state: LifecycleState::Starting,
            drain_outcome: None,
            started,
        }
    }

    /// Time since process start.
    pub fn uptime(&self) -> std::time::Duration {
        self.started.instant.elapsed()
    }
}

/// Single writer of the status snapshot.
pub struct StatusBoard {
    current: Arc<ArcSwap<StatusSnapshot>>,
}

impl StatusBoard {
    /// Create a board in the `Starting` state.
    pub fn new(started: Stamp) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(StatusSnapshot::initial(started))),
        }
    }

    /// A read-only handle onto this board.
    pub fn view(&self) -> StatusView {
        StatusView {
            current: Arc::clone(&self.current),
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<StatusSnapshot> {
        self.current.load_full()
    }

    /// Publish a lifecycle state.
    pub(crate) fn set_state(&self, state: LifecycleState) {
        self.update(|s| s.state = state);
    }

    /// Record readiness. Only the first result is kept.
    pub(crate) fn set_ready(&self, result: &ReadinessResult) {
        self.update(|s| {
            if s.ready_at.is_some() {
                return;
            }
            let latency = result.ready_at.since(&s.started);
            s.ready_at = Some(result.ready_at.wall);
            s.ready_latency_ms = Some(u64::try_from(latency.as_millis()).unwrap_or(u64::MAX));
            s.readiness_succeeded = Some(result.succeeded);
            s.readiness_attempts = Some(result.attempts);
        });
    }

    /// Publish how the drain ended.
    pub(crate) fn set_drain_outcome(&self, outcome: DrainOutcome) {
        self.update(|s| s.drain_outcome = Some(outcome));
    }

    fn update(&self, f: impl FnOnce(&mut StatusSnapshot)) {
        // Single writer, so load-modify-store cannot lose an update.
        let mut next = StatusSnapshot::clone(&self.current.load());
        f(&mut next);
        self.current.store(Arc::new(next));
    }
}

/// Read-only, cloneable view of the status board.
#[derive(Clone)]
pub struct StatusView {
    current: Arc<ArcSwap<StatusSnapshot>>,
}

impl StatusView {
    /// Current snapshot. Later writes do not change it.
    pub fn snapshot(&self) -> Arc<StatusSnapshot> {
        self.current.load_full()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.current.load().state
    }
}
