//! Process lifecycle state machine.
//!
//! # States
//! ```text
//! Starting → Listening → Ready → Draining → Stopped
//! ```
//!
//! Transitions only move forward. Skipping ahead is allowed (a signal that
//! arrives before readiness goes `Listening → Draining`, a bind failure goes
//! `Starting → Stopped`); moving back or staying put is rejected.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

/// Lifecycle of the harness process.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Starting = 0,
    Listening = 1,
    Ready = 2,
    Draining = 3,
    Stopped = 4,
}

impl LifecycleState {
    /// Whether `next` is reachable from this state.
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        next > self
    }

    /// Lowercase name, as used in logs and metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Starting => "starting",
            LifecycleState::Listening => "listening",
            LifecycleState::Ready => "ready",
            LifecycleState::Draining => "draining",
            LifecycleState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point in time read from both clocks.
///
/// `instant` is used for every elapsed-time computation; `wall` is only
/// for display. `instant` follows Tokio's clock, so it honours a paused
/// test runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamp {
    pub instant: Instant,
    pub wall: DateTime<Utc>,
}

impl Stamp {
    /// Read both clocks.
    pub fn now() -> Self {
        Self {
            instant: Instant::now(),
            wall: Utc::now(),
        }
    }

    /// Monotonic time elapsed since `earlier`, zero if `earlier` is later.
    pub fn since(&self, earlier: &Stamp) -> std::time::Duration {
        self.instant.saturating_duration_since(earlier.instant)
    }
}
