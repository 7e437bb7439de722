//! Shared utilities for lifecycle and HTTP integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinSet;

use reload_harness::lifecycle::{LifecycleState, StatusView};
use reload_harness::net::{InFlightTracker, ServeHandle};

/// In-process stand-in for a listener: "requests" are timed tasks.
pub struct SimulatedListener {
    remote: SimulatedRemote,
}

/// Test-side handle for injecting work into a `SimulatedListener`.
#[derive(Clone)]
pub struct SimulatedRemote {
    tracker: InFlightTracker,
    accepting: Arc<AtomicBool>,
    forced: Arc<AtomicBool>,
    completed: Arc<AtomicU32>,
    jobs: Arc<Mutex<JoinSet<()>>>,
}

impl SimulatedListener {
    pub fn new() -> Self {
        Self {
            remote: SimulatedRemote {
                tracker: InFlightTracker::new(),
                accepting: Arc::new(AtomicBool::new(true)),
                forced: Arc::new(AtomicBool::new(false)),
                completed: Arc::new(AtomicU32::new(0)),
                jobs: Arc::new(Mutex::new(JoinSet::new())),
            },
        }
    }

    pub fn remote(&self) -> SimulatedRemote {
        self.remote.clone()
    }
}

impl SimulatedRemote {
    /// Start a request lasting `duration`. `false` if no longer accepting.
    pub fn request(&self, duration: Duration) -> bool {
        if !self.accepting.load(Ordering::SeqCst) {
            return false;
        }
        let guard = self.tracker.track();
        let completed = Arc::clone(&self.completed);
        self.jobs.lock().unwrap().spawn(async move {
            tokio::time::sleep(duration).await;
            completed.fetch_add(1, Ordering::SeqCst);
            drop(guard);
        });
        true
    }

    pub fn in_flight(&self) -> u64 {
        self.tracker.active_count()
    }

    pub fn completed(&self) -> u32 {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn was_forced(&self) -> bool {
        self.forced.load(Ordering::SeqCst)
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }
}

impl ServeHandle for SimulatedListener {
    fn stop_accepting(&mut self) {
        self.remote.accepting.store(false, Ordering::SeqCst);
    }

    fn drained(&mut self) -> impl Future<Output = ()> + Send + '_ {
        async move { self.remote.tracker.wait_idle().await }
    }

    fn force_close(&mut self) {
        self.remote.forced.store(true, Ordering::SeqCst);
        self.remote.jobs.lock().unwrap().abort_all();
    }
}

/// Health predicate that succeeds from the `k`-th call on (never if `k == 0`).
pub fn succeed_on(k: u32) -> (Arc<AtomicU32>, impl FnMut() -> std::future::Ready<bool>) {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let check = move || {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        std::future::ready(k != 0 && n >= k)
    };
    (calls, check)
}

/// Poll until the lifecycle reaches at least `target`.
pub async fn wait_for_state(status: &StatusView, target: LifecycleState) {
    while status.state() < target {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}
