//! Crate-level error type and process exit codes.

use thiserror::Error;

use crate::config::loader::ConfigError;
use crate::lifecycle::state::LifecycleState;
use crate::net::listener::ListenerError;

/// Exit code for a drain that finished before its deadline.
pub const EXIT_CLEAN: u8 = 0;
/// Exit code for startup failures other than binding (config, signal handlers).
pub const EXIT_STARTUP_FAILED: u8 = 1;
/// Exit code for a listener that could not bind.
pub const EXIT_BIND_FAILED: u8 = 2;
/// Exit code for a drain that was cut short by its deadline or a second signal.
pub const EXIT_FORCED_DRAIN: u8 = 3;

/// Errors that stop the harness before or while it serves traffic.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The listener could not be bound. Fatal, never retried.
    #[error("listener failed to start: {0}")]
    Bind(#[from] ListenerError),

    /// Configuration could not be loaded or failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// OS signal handlers could not be installed.
    #[error("failed to install signal handlers: {0}")]
    Signals(#[source] std::io::Error),

    /// The lifecycle state machine was asked to move backwards.
    #[error("illegal lifecycle transition {from} -> {to}")]
    IllegalTransition {
        from: LifecycleState,
        to: LifecycleState,
    },
}

impl HarnessError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            HarnessError::Bind(_) => EXIT_BIND_FAILED,
            _ => EXIT_STARTUP_FAILED,
        }
    }
}
