//! Metrics exposition.
//!
//! # Metrics
//! - `harness_lifecycle_transitions_total` (counter): by target state
//! - `harness_ready_latency_seconds` (gauge): process start to ready
//! - `harness_readiness_attempts` (gauge): probe attempts used
//! - `harness_drain_total` (counter): by outcome
//! - `harness_in_flight_requests` (gauge): requests being served
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed
//! - The Prometheus exporter runs its own listener, independent of the
//!   drained application listener

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}
