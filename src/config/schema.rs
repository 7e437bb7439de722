//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the harness.
//! All types derive Serde traits for deserialization from config files.

use std::num::NonZeroU32;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the harness process.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HarnessConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Simulated slow initialisation before the listener starts.
    pub startup: StartupConfig,

    /// Self readiness probing.
    pub readiness: ReadinessConfig,

    /// Graceful shutdown policy.
    pub shutdown: ShutdownConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Startup configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StartupConfig {
    /// Delay before the listener is started, in milliseconds.
    pub delay_ms: u64,
}

impl StartupConfig {
    /// Simulated initialisation time before the listener starts.
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Readiness probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Path probed on the local listener.
    pub path: String,

    /// Maximum number of probe attempts (must be >= 1).
    pub max_attempts: u32,

    /// Pause between attempts in milliseconds.
    pub interval_ms: u64,

    /// Pause before the first attempt in milliseconds.
    pub initial_delay_ms: u64,

    /// Timeout for a single probe request in milliseconds.
    pub request_timeout_ms: u64,

    /// How long an external reload proxy keeps retrying, in milliseconds.
    /// Readiness slower than this is reported as a likely failed reload.
    pub proxy_budget_ms: u64,
}

impl ReadinessConfig {
    /// Attempt budget, or `None` when configured as zero.
    pub fn attempts(&self) -> Option<NonZeroU32> {
        NonZeroU32::new(self.max_attempts)
    }

    /// Pause between readiness attempts.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Pause before the first readiness attempt.
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Timeout for a single health check request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Readiness latency above which a proxied reload is expected to fail.
    pub fn proxy_budget(&self) -> Duration {
        Duration::from_millis(self.proxy_budget_ms)
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            path: "/health".to_string(),
            max_attempts: 50,
            interval_ms: 10,
            initial_delay_ms: 10,
            request_timeout_ms: 500,
            proxy_budget_ms: 1000,
        }
    }
}

/// Graceful shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Maximum time to wait for in-flight requests after a signal, in milliseconds.
    pub deadline_ms: u64,
}

impl ShutdownConfig {
    /// How long in-flight work may run after a termination signal.
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { deadline_ms: 100 }
    }
}

/// Timeout configuration for request handling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
