//! End-to-end lifecycle scenarios against a simulated listener.

use std::num::NonZeroU32;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::time::Instant;

use reload_harness::error::{EXIT_CLEAN, EXIT_FORCED_DRAIN};
use reload_harness::lifecycle::signals::synthetic;
use reload_harness::lifecycle::{
    DrainOutcome, ForceReason, LifecycleState, ProcessSupervisor, SignalKind, SupervisorSettings,
};

mod common;

use common::{succeed_on, wait_for_state, SimulatedListener};

fn settings(attempts: u32, interval_ms: u64, deadline_ms: u64) -> SupervisorSettings {
    SupervisorSettings::new(
        NonZeroU32::new(attempts).unwrap(),
        Duration::from_millis(interval_ms),
        Duration::from_millis(deadline_ms),
    )
}

#[tokio::test(start_paused = true)]
async fn scenario_a_ready_on_third_attempt() {
    let (trigger, signals) = synthetic();
    let supervisor = ProcessSupervisor::new(settings(10, 100, 100), signals);
    let status = supervisor.status();
    let listener = SimulatedListener::new();
    let (calls, check) = succeed_on(3);

    let driver = async {
        wait_for_state(&status, LifecycleState::Ready).await;
        let snapshot = status.snapshot();
        assert_eq!(snapshot.readiness_attempts, Some(3));
        assert_eq!(snapshot.readiness_succeeded, Some(true));
        assert_eq!(snapshot.ready_latency_ms, Some(200));
        assert!(snapshot.ready_at.unwrap() >= snapshot.process_started_at);
        trigger.send(SignalKind::Interrupt);
    };

    let (outcome, ()) = tokio::join!(
        supervisor.run(|| async { Ok(listener) }, |_| check),
        driver
    );

    assert_eq!(outcome.unwrap(), DrainOutcome::Clean);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(status.state(), LifecycleState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn scenario_b_exhausted_readiness_still_reaches_ready() {
    let (trigger, signals) = synthetic();
    let supervisor = ProcessSupervisor::new(settings(5, 50, 100), signals);
    let status = supervisor.status();
    let listener = SimulatedListener::new();
    let (calls, check) = succeed_on(0);

    let driver = async {
        wait_for_state(&status, LifecycleState::Ready).await;
        let snapshot = status.snapshot();
        assert_eq!(snapshot.readiness_succeeded, Some(false));
        assert_eq!(snapshot.readiness_attempts, Some(5));
        let latency = snapshot.ready_latency_ms.unwrap();
        assert!((200..=250).contains(&latency), "latency {latency}ms");
        trigger.send(SignalKind::Terminate);
    };

    let (outcome, ()) = tokio::join!(
        supervisor.run(|| async { Ok(listener) }, |_| check),
        driver
    );

    assert_eq!(outcome.unwrap(), DrainOutcome::Clean);
    assert_eq!(calls.load(Ordering::SeqCst), 5);
}

#[tokio::test(start_paused = true)]
async fn scenario_c_in_flight_work_finishes_within_deadline() {
    let (trigger, signals) = synthetic();
    let supervisor = ProcessSupervisor::new(settings(3, 10, 100), signals);
    let status = supervisor.status();
    let listener = SimulatedListener::new();
    let remote = listener.remote();

    let driver = async {
        wait_for_state(&status, LifecycleState::Ready).await;
        assert!(remote.request(Duration::from_millis(50)));
        let signaled = Instant::now();
        trigger.send(SignalKind::Interrupt);

        wait_for_state(&status, LifecycleState::Stopped).await;
        signaled.elapsed()
    };

    let (outcome, drain_time) = tokio::join!(
        supervisor.run(|| async { Ok(listener) }, |_| || async { true }),
        driver
    );

    let outcome = outcome.unwrap();
    assert_eq!(outcome, DrainOutcome::Clean);
    assert_eq!(outcome.exit_code(), EXIT_CLEAN);
    assert!(drain_time < Duration::from_millis(100), "drained in {drain_time:?}");
    assert_eq!(remote.completed(), 1);
    assert!(!remote.was_forced());
    assert!(!remote.is_accepting());
    assert_eq!(status.snapshot().drain_outcome, Some(DrainOutcome::Clean));
}

#[tokio::test(start_paused = true)]
async fn scenario_d_slow_work_is_forced_at_deadline() {
    let (trigger, signals) = synthetic();
    let supervisor = ProcessSupervisor::new(settings(3, 10, 100), signals);
    let status = supervisor.status();
    let listener = SimulatedListener::new();
    let remote = listener.remote();

    let driver = async {
        wait_for_state(&status, LifecycleState::Ready).await;
        assert!(remote.request(Duration::from_millis(500)));
        let signaled = Instant::now();
        trigger.send(SignalKind::Terminate);

        wait_for_state(&status, LifecycleState::Stopped).await;
        signaled.elapsed()
    };

    let (outcome, drain_time) = tokio::join!(
        supervisor.run(|| async { Ok(listener) }, |_| || async { true }),
        driver
    );

    let outcome = outcome.unwrap();
    assert_eq!(outcome, DrainOutcome::Forced(ForceReason::DeadlineElapsed));
    assert_eq!(outcome.exit_code(), EXIT_FORCED_DRAIN);
    assert!(drain_time >= Duration::from_millis(100));
    assert!(drain_time < Duration::from_millis(110), "drained in {drain_time:?}");
    assert!(remote.was_forced());
    assert_eq!(remote.completed(), 0);
}

#[tokio::test(start_paused = true)]
async fn signal_before_readiness_abandons_probe() {
    let (trigger, signals) = synthetic();
    let supervisor = ProcessSupervisor::new(settings(1000, 100, 100), signals);
    let status = supervisor.status();
    let listener = SimulatedListener::new();
    let (calls, check) = succeed_on(0);

    let driver = async {
        wait_for_state(&status, LifecycleState::Listening).await;
        tokio::time::sleep(Duration::from_millis(250)).await;
        trigger.send(SignalKind::Interrupt);
    };

    let (outcome, ()) = tokio::join!(
        supervisor.run(|| async { Ok(listener) }, |_| check),
        driver
    );

    assert_eq!(outcome.unwrap(), DrainOutcome::Clean);
    let snapshot = status.snapshot();
    assert_eq!(snapshot.state, LifecycleState::Stopped);
    assert!(snapshot.ready_at.is_none());
    assert!(snapshot.readiness_succeeded.is_none());
    assert!(calls.load(Ordering::SeqCst) <= 4);
}

#[tokio::test(start_paused = true)]
async fn second_signal_escalates_drain() {
    let (trigger, signals) = synthetic();
    let supervisor = ProcessSupervisor::new(settings(3, 10, 1000), signals);
    let status = supervisor.status();
    let listener = SimulatedListener::new();
    let remote = listener.remote();

    let driver = async {
        wait_for_state(&status, LifecycleState::Ready).await;
        assert!(remote.request(Duration::from_secs(10)));
        let signaled = Instant::now();
        trigger.send(SignalKind::Interrupt);

        wait_for_state(&status, LifecycleState::Draining).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.send(SignalKind::Interrupt);

        wait_for_state(&status, LifecycleState::Stopped).await;
        signaled.elapsed()
    };

    let (outcome, drain_time) = tokio::join!(
        supervisor.run(|| async { Ok(listener) }, |_| || async { true }),
        driver
    );

    assert_eq!(
        outcome.unwrap(),
        DrainOutcome::Forced(ForceReason::Escalated)
    );
    assert!(drain_time < Duration::from_millis(1000), "drained in {drain_time:?}");
    assert!(remote.was_forced());
}

#[tokio::test(start_paused = true)]
async fn no_new_work_accepted_once_draining() {
    let (trigger, signals) = synthetic();
    let supervisor = ProcessSupervisor::new(settings(3, 10, 100), signals);
    let status = supervisor.status();
    let listener = SimulatedListener::new();
    let remote = listener.remote();

    let driver = async {
        wait_for_state(&status, LifecycleState::Ready).await;
        assert!(remote.request(Duration::from_millis(30)));
        trigger.send(SignalKind::Terminate);

        wait_for_state(&status, LifecycleState::Draining).await;
        assert!(!remote.request(Duration::from_millis(1)));
        assert_eq!(remote.in_flight(), 1);
    };

    let (outcome, ()) = tokio::join!(
        supervisor.run(|| async { Ok(listener) }, |_| || async { true }),
        driver
    );

    assert_eq!(outcome.unwrap(), DrainOutcome::Clean);
    assert_eq!(remote.completed(), 1);
}
