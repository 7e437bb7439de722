//! Readiness probing.
//!
//! # Responsibilities
//! - Run a health predicate until it succeeds or the attempt budget runs out
//! - Record when (and after how many attempts) the process became ready
//!
//! # Design Decisions
//! - A failed attempt is not an error; it only consumes budget
//! - Exhaustion is a normal outcome (`succeeded == false`), never a panic or `Err`
//! - No sleep after the final attempt, so the probe is bounded by
//!   `initial_delay + (max_attempts - 1) * interval` plus predicate cost

use std::future::Future;
use std::num::NonZeroU32;
use std::time::Duration;

use crate::lifecycle::state::Stamp;

/// Outcome of one readiness probe run. Produced once, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessResult {
    /// First successful attempt, or the last attempt on exhaustion.
    pub ready_at: Stamp,
    /// Attempts made, always >= 1.
    pub attempts: u32,
    pub succeeded: bool,
}

/// Repeatedly checks a health predicate with a fixed interval.
#[derive(Debug, Clone)]
pub struct ReadinessProbe {
    max_attempts: NonZeroU32,
    interval: Duration,
    initial_delay: Duration,
}

impl ReadinessProbe {
    /// Create a probe with an attempt budget and a fixed interval.
    pub fn new(max_attempts: NonZeroU32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
            initial_delay: Duration::ZERO,
        }
    }

    /// Wait this long before the first attempt.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Run `check` until it returns `true` or the budget is exhausted.
    pub async fn probe<F, Fut>(&self, mut check: F) -> ReadinessResult
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        if !self.initial_delay.is_zero() {
            tokio::time::sleep(self.initial_delay).await;
        }

        let max_attempts = self.max_attempts.get();
        let mut attempt = 1;
        loop {
            let healthy = check().await;
            let at = Stamp::now();

            if healthy {
                tracing::debug!(attempt, "Readiness check succeeded");
                return ReadinessResult {
                    ready_at: at,
                    attempts: attempt,
                    succeeded: true,
                };
            }

            if attempt >= max_attempts {
                tracing::warn!(
                    attempts = attempt,
                    "Readiness check budget exhausted"
                );
                return ReadinessResult {
                    ready_at: at,
                    attempts: attempt,
                    succeeded: false,
                };
            }

            tracing::trace!(attempt, max_attempts, "Readiness check failed, retrying");
            attempt += 1;
            tokio::time::sleep(self.interval).await;
        }
    }
}
