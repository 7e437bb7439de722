//! Lifecycle tests against the real HTTP server on an ephemeral port.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::oneshot;

use reload_harness::config::HarnessConfig;
use reload_harness::error::{HarnessError, EXIT_BIND_FAILED};
use reload_harness::health::HttpHealthCheck;
use reload_harness::http::{HttpServer, ServerHandle, X_REQUEST_ID};
use reload_harness::lifecycle::signals::{synthetic, SignalTrigger};
use reload_harness::lifecycle::{
    DrainOutcome, ForceReason, LifecycleState, ProcessSupervisor, SignalKind, StatusView,
    SupervisorSettings,
};

mod common;

use common::wait_for_state;

fn test_config(deadline_ms: u64) -> HarnessConfig {
    let mut config = HarnessConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.readiness.max_attempts = 20;
    config.readiness.interval_ms = 10;
    config.shutdown.deadline_ms = deadline_ms;
    config
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

struct Running {
    trigger: SignalTrigger,
    status: StatusView,
    addr: SocketAddr,
    outcome: tokio::task::JoinHandle<Result<DrainOutcome, HarnessError>>,
}

/// Start a supervised server and wait until it reports `Ready`.
async fn start(config: HarnessConfig) -> Running {
    let (trigger, signals) = synthetic();
    let settings = SupervisorSettings::from_config(&config).unwrap();
    let supervisor = ProcessSupervisor::new(settings, signals);
    let status = supervisor.status();
    let server = HttpServer::new(&config, status.clone());
    let (addr_tx, addr_rx) = oneshot::channel();
    let readiness = config.readiness.clone();

    let outcome = tokio::spawn(supervisor.run(
        move || server.start(),
        move |handle: &ServerHandle| {
            let _ = addr_tx.send(handle.local_addr());
            let check = HttpHealthCheck::new(
                handle.local_addr(),
                &readiness.path,
                readiness.request_timeout(),
            )
            .unwrap();
            move || {
                let check = check.clone();
                async move { check.check().await }
            }
        },
    ));

    let addr = addr_rx.await.expect("listener should bind");
    tokio::time::timeout(
        Duration::from_secs(5),
        wait_for_state(&status, LifecycleState::Ready),
    )
    .await
    .expect("server should become ready");

    Running {
        trigger,
        status,
        addr,
        outcome,
    }
}

#[tokio::test]
async fn reports_readiness_over_http() {
    let running = start(test_config(1000)).await;
    let client = client();

    let status: Value = client
        .get(format!("http://{}/status", running.addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["currentLifecycleState"], "ready");
    assert_eq!(status["readinessSucceeded"], true);
    assert!(status["readinessAttempts"].as_u64().unwrap() >= 1);
    assert!(status["readyAt"].is_string());
    assert!(status["processStartedAt"].is_string());

    let response = client
        .get(format!("http://{}/health", running.addr))
        .send()
        .await
        .unwrap();
    assert!(response.headers().contains_key(X_REQUEST_ID));
    let health: Value = response.json().await.unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["pid"], std::process::id());
    assert!(health["server_ready"].is_string());

    running.trigger.send(SignalKind::Interrupt);
    let outcome = running.outcome.await.unwrap().unwrap();
    assert_eq!(outcome, DrainOutcome::Clean);
    assert_eq!(running.status.state(), LifecycleState::Stopped);
}

#[tokio::test]
async fn clean_drain_lets_in_flight_request_finish() {
    let running = start(test_config(1000)).await;
    let client = client();

    let url = format!("http://{}/sleep/100", running.addr);
    let request = tokio::spawn(async move { client.get(url).send().await });
    tokio::time::sleep(Duration::from_millis(30)).await;

    running.trigger.send(SignalKind::Terminate);
    let outcome = running.outcome.await.unwrap().unwrap();
    assert_eq!(outcome, DrainOutcome::Clean);
    assert_eq!(outcome.exit_code(), 0);

    let response = request.await.unwrap().unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["slept_ms"], 100);
}

#[tokio::test]
async fn slow_request_is_forced_at_deadline() {
    let running = start(test_config(100)).await;
    let client = client();

    let url = format!("http://{}/sleep/2000", running.addr);
    let request = tokio::spawn(async move { client.get(url).send().await });
    tokio::time::sleep(Duration::from_millis(30)).await;

    let signaled = Instant::now();
    running.trigger.send(SignalKind::Terminate);
    let outcome = running.outcome.await.unwrap().unwrap();
    let drain_time = signaled.elapsed();

    assert_eq!(outcome, DrainOutcome::Forced(ForceReason::DeadlineElapsed));
    assert_ne!(outcome.exit_code(), 0);
    assert!(drain_time < Duration::from_millis(1000), "drained in {drain_time:?}");

    // The forced request is cut short rather than served in full.
    let result = tokio::time::timeout(Duration::from_secs(1), request)
        .await
        .expect("forced request should end promptly")
        .unwrap();
    if let Ok(response) = result {
        assert_eq!(response.status(), 503);
    }
}

#[tokio::test]
async fn new_connections_refused_after_drain() {
    let running = start(test_config(200)).await;
    let addr = running.addr;

    running.trigger.send(SignalKind::Interrupt);
    running.outcome.await.unwrap().unwrap();

    let result = client().get(format!("http://{}/health", addr)).send().await;
    assert!(result.is_err());
}

#[tokio::test]
async fn bind_failure_is_fatal() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let mut config = test_config(100);
    config.listener.bind_address = occupied.local_addr().unwrap().to_string();

    let (_trigger, signals) = synthetic();
    let supervisor =
        ProcessSupervisor::new(SupervisorSettings::from_config(&config).unwrap(), signals);
    let status = supervisor.status();
    let server = HttpServer::new(&config, status.clone());

    let result = supervisor
        .run(move || server.start(), |_: &ServerHandle| || async { true })
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, HarnessError::Bind(_)));
    assert_eq!(err.exit_code(), EXIT_BIND_FAILED);
    assert_eq!(status.state(), LifecycleState::Stopped);
    assert!(status.snapshot().ready_at.is_none());
}
