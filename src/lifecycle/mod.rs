//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (supervisor.rs):
//!     Record start → Start listener → Probe readiness (health/probe.rs)
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain connections → Clean | Forced
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → ShutdownRequest (first one latched)
//!     Second SIGTERM/SIGINT while draining → forced stop
//!
//! Status (status.rs):
//!     Supervisor publishes snapshots → /status, /health, tests
//! ```
//!
//! # Design Decisions
//! - Ordered startup: bind first, then probe (traffic only once bound)
//! - Ordered shutdown: stop accept, drain, close
//! - Shutdown has a deadline: forced close after it elapses

pub mod shutdown;
pub mod signals;
pub mod state;
pub mod status;
pub mod supervisor;

pub use shutdown::{DrainOutcome, ForceReason, ShutdownCoordinator, ShutdownRequest};
pub use signals::{OsSignals, SignalKind, SignalSource};
pub use state::LifecycleState;
pub use status::{StatusSnapshot, StatusView};
pub use supervisor::{ProcessSupervisor, SupervisorSettings};
