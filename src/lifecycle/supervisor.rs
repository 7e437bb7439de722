//! Process supervision: the composition root of the lifecycle.
//!
//! # Sequence
//! ```text
//! record start → [startup delay] → start listener → probe ∥ await signal
//!     → ready → await signal → drain → stopped
//! ```
//!
//! # Design Decisions
//! - Fail fast: a bind failure stops the process before any probing
//! - Readiness is observed concurrently; a signal abandons the probe
//! - Exhausted readiness still reaches `Ready`, flagged as a fallback
//! - Only the supervisor moves the lifecycle state, one step at a time

use std::future::Future;
use std::num::NonZeroU32;
use std::time::Duration;

use crate::config::validation::ValidationError;
use crate::config::{ConfigError, HarnessConfig};
use crate::error::HarnessError;
use crate::health::probe::{ReadinessProbe, ReadinessResult};
use crate::lifecycle::shutdown::{DrainOutcome, ShutdownCoordinator};
use crate::lifecycle::signals::SignalSource;
use crate::lifecycle::state::{LifecycleState, Stamp};
use crate::lifecycle::status::{StatusBoard, StatusView};
use crate::net::listener::{ListenerError, ServeHandle};

/// Timing policy for one supervised run.
#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    pub startup_delay: Duration,
    pub max_ready_attempts: NonZeroU32,
    pub ready_interval: Duration,
    pub ready_initial_delay: Duration,
    pub shutdown_deadline: Duration,
    /// Readiness slower than this is reported as a likely failed proxied reload.
    pub proxy_budget: Option<Duration>,
}

impl SupervisorSettings {
    /// Settings with no startup delay, initial delay or proxy budget.
    pub fn new(
        max_ready_attempts: NonZeroU32,
        ready_interval: Duration,
        shutdown_deadline: Duration,
    ) -> Self {
        Self {
            startup_delay: Duration::ZERO,
            max_ready_attempts,
            ready_interval,
            ready_initial_delay: Duration::ZERO,
            shutdown_deadline,
            proxy_budget: None,
        }
    }

    /// Derive settings from a configuration.
    pub fn from_config(config: &HarnessConfig) -> Result<Self, ConfigError> {
        let max_ready_attempts = config.readiness.attempts().ok_or_else(|| {
            ConfigError::Validation(vec![ValidationError::new(
                "readiness.max_attempts",
                "must be at least 1",
            )])
        })?;

        Ok(Self {
            startup_delay: config.startup.delay(),
            max_ready_attempts,
            ready_interval: config.readiness.interval(),
            ready_initial_delay: config.readiness.initial_delay(),
            shutdown_deadline: config.shutdown.deadline(),
            proxy_budget: Some(config.readiness.proxy_budget()),
        })
    }
}

/// Sequences start → ready → serve → signaled → drain → stop.
pub struct ProcessSupervisor<S> {
    settings: SupervisorSettings,
    coordinator: ShutdownCoordinator<S>,
    board: StatusBoard,
    started: Stamp,
}

impl<S: SignalSource> ProcessSupervisor<S> {
    /// Create the supervisor. The process start time is recorded here.
    pub fn new(settings: SupervisorSettings, signals: S) -> Self {
        let started = Stamp::now();
        tracing::info!(pid = std::process::id(), "Process started");
        Self {
            settings,
            coordinator: ShutdownCoordinator::new(signals),
            board: StatusBoard::new(started),
            started,
        }
    }

    /// Read-only view of the lifecycle status.
    pub fn status(&self) -> StatusView {
        self.board.view()
    }

    /// Run the process lifecycle to completion.
    ///
    /// `start_listener` binds and spawns the serve loop without blocking on
    /// it. `health_check` builds the readiness predicate for the started
    /// listener (it usually needs the bound address).
    pub async fn run<L, Start, StartFut, Make, Check, CheckFut>(
        mut self,
        start_listener: Start,
        health_check: Make,
    ) -> Result<DrainOutcome, HarnessError>
    where
        L: ServeHandle,
        Start: FnOnce() -> StartFut,
        StartFut: Future<Output = Result<L, ListenerError>>,
        Make: FnOnce(&L) -> Check,
        Check: FnMut() -> CheckFut,
        CheckFut: Future<Output = bool>,
    {
        let mut state = LifecycleState::Starting;

        if !self.settings.startup_delay.is_zero() {
            tracing::info!(delay = ?self.settings.startup_delay, "Simulating slow initialisation");
            tokio::select! {
                _ = tokio::time::sleep(self.settings.startup_delay) => {
                    tracing::info!("Initialisation complete");
                }
                request = self.coordinator.await_signal() => {
                    tracing::info!(signal = %request.kind, "Signal during initialisation, nothing to drain");
                    self.transition(&mut state, LifecycleState::Stopped)?;
                    self.board.set_drain_outcome(DrainOutcome::Clean);
                    return Ok(DrainOutcome::Clean);
                }
            }
        }

        let mut listener = match start_listener().await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(error = %e, "Listener failed to start");
                self.transition(&mut state, LifecycleState::Stopped)?;
                return Err(HarnessError::Bind(e));
            }
        };
        self.transition(&mut state, LifecycleState::Listening)?;

        let probe = ReadinessProbe::new(self.settings.max_ready_attempts, self.settings.ready_interval)
            .with_initial_delay(self.settings.ready_initial_delay);
        let check = health_check(&listener);

        let readiness = tokio::select! {
            result = probe.probe(check) => Some(result),
            request = self.coordinator.await_signal() => {
                tracing::warn!(signal = %request.kind, "Signal before readiness, abandoning probe");
                None
            }
        };

        if let Some(result) = readiness {
            self.record_ready(&result);
            self.transition(&mut state, LifecycleState::Ready)?;
            self.coordinator.await_signal().await;
        }

        self.transition(&mut state, LifecycleState::Draining)?;
        let outcome = self
            .coordinator
            .drain_and_stop(&mut listener, self.settings.shutdown_deadline)
            .await;
        self.board.set_drain_outcome(outcome);
        self.transition(&mut state, LifecycleState::Stopped)?;

        Ok(outcome)
    }

    fn record_ready(&self, result: &ReadinessResult) {
        let elapsed = result.ready_at.since(&self.started);
        self.board.set_ready(result);

        metrics::gauge!("harness_ready_latency_seconds").set(elapsed.as_secs_f64());
        metrics::gauge!("harness_readiness_attempts").set(f64::from(result.attempts));

        if result.succeeded {
            tracing::info!(
                attempts = result.attempts,
                elapsed_ms = elapsed.as_millis() as u64,
                "Server ready to accept connections (time from process start to ready: {:?})",
                elapsed
            );
        } else {
            tracing::warn!(
                attempts = result.attempts,
                elapsed_ms = elapsed.as_millis() as u64,
                "Readiness never confirmed, assuming ready at last attempt"
            );
        }

        if let Some(budget) = self.settings.proxy_budget {
            if elapsed > budget {
                tracing::warn!(
                    budget_ms = budget.as_millis() as u64,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Readiness slower than the reload proxy retry window; a proxied reload would fail"
                );
            }
        }
    }

    fn transition(
        &self,
        state: &mut LifecycleState,
        next: LifecycleState,
    ) -> Result<(), HarnessError> {
        if !state.can_transition_to(next) {
            return Err(HarnessError::IllegalTransition {
                from: *state,
                to: next,
            });
        }

        tracing::info!(from = %state, to = %next, "Lifecycle transition");
        *state = next;
        self.board.set_state(next);
        metrics::counter!("harness_lifecycle_transitions_total", "state" => next.as_str())
            .increment(1);
        Ok(())
    }
}
