//! Demo endpoints.
//!
//! Small on purpose: the harness is about lifecycle timing, not content.

use std::time::Duration;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::http::server::AppState;
use crate::lifecycle::status::StatusSnapshot;

/// Longest hold accepted by `/sleep/{millis}`.
pub const MAX_SLEEP_MS: u64 = 60_000;

#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
    pub pid: u32,
    pub uptime_seconds: f64,
    pub startup_seconds: f64,
    pub process_started: String,
    pub server_ready: Option<String>,
    pub current_time: String,
}

#[derive(Debug, Serialize)]
pub struct StatusBody {
    #[serde(flatten)]
    pub snapshot: StatusSnapshot,
    pub in_flight: u64,
}

#[derive(Debug, Serialize)]
pub struct TimeBody {
    pub timestamp: String,
    pub unix: i64,
    pub unix_nano: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SleepBody {
    pub slept_ms: u64,
}

/// Plain greeting with the pid and lifecycle state.
pub async fn index(State(state): State<AppState>) -> String {
    let snapshot = state.status.snapshot();
    format!("Hello! PID={}, state={}\n", snapshot.pid, snapshot.state)
}

/// Health report: start, ready and current timestamps.
pub async fn health(State(state): State<AppState>) -> Json<HealthBody> {
    let snapshot = state.status.snapshot();
    let startup_seconds = snapshot
        .ready_latency_ms
        .map(|ms| ms as f64 / 1000.0)
        .unwrap_or(0.0);

    Json(HealthBody {
        status: "healthy",
        pid: snapshot.pid,
        uptime_seconds: snapshot.uptime().as_secs_f64(),
        startup_seconds,
        process_started: snapshot
            .process_started_at
            .to_rfc3339_opts(SecondsFormat::Nanos, true),
        server_ready: snapshot
            .ready_at
            .map(|at| at.to_rfc3339_opts(SecondsFormat::Nanos, true)),
        current_time: Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true),
    })
}

/// Full status snapshot plus the in-flight request count.
pub async fn status(State(state): State<AppState>) -> Json<StatusBody> {
    Json(StatusBody {
        snapshot: StatusSnapshot::clone(&state.status.snapshot()),
        in_flight: state.tracker.active_count(),
    })
}

/// Current wall-clock time.
pub async fn time() -> Json<TimeBody> {
    let now = Utc::now();
    Json(TimeBody {
        timestamp: now.to_rfc3339_opts(SecondsFormat::Nanos, true),
        unix: now.timestamp(),
        unix_nano: now.timestamp_nanos_opt(),
    })
}

/// Hold the request open for `millis` to simulate in-flight work.
pub async fn sleep(Path(millis): Path<u64>) -> Json<SleepBody> {
    let millis = millis.min(MAX_SLEEP_MS);
    tokio::time::sleep(Duration::from_millis(millis)).await;
    Json(SleepBody { slept_ms: millis })
}
