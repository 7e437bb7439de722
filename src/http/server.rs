//! HTTP server setup and the running-server handle.
//!
//! # Responsibilities
//! - Create Axum Router with the demo handlers
//! - Wire up middleware (tracing, timeout, request ID, in-flight tracking)
//! - Bind, then spawn the serve loop without blocking the caller
//! - Expose the running loop to the shutdown path as a `ServeHandle`

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::HarnessConfig;
use crate::http::handlers;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::lifecycle::status::StatusView;
use crate::net::connection::InFlightTracker;
use crate::net::listener::{self, ListenerError, ServeHandle};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub status: StatusView,
    pub tracker: InFlightTracker,
    forced: watch::Receiver<bool>,
}

/// HTTP server for the harness, not yet bound.
pub struct HttpServer {
    bind_address: String,
    request_timeout: Duration,
    status: StatusView,
}

impl HttpServer {
    /// Create a server from configuration. Nothing is bound until `start`.
    pub fn new(config: &HarnessConfig, status: StatusView) -> Self {
        Self {
            bind_address: config.listener.bind_address.clone(),
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
            status,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(&self, state: AppState) -> Router {
        Router::new()
            .route("/", get(handlers::index))
            .route("/health", get(handlers::health))
            .route("/status", get(handlers::status))
            .route("/api/time", get(handlers::time))
            .route("/sleep/{millis}", get(handlers::sleep))
            .layer(middleware::from_fn_with_state(state.clone(), track_in_flight))
            .with_state(state)
            .layer(TimeoutLayer::new(self.request_timeout))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Bind the listener and spawn the serve loop.
    ///
    /// Returns as soon as the socket is bound; serving happens in the
    /// background. A bind failure is returned immediately.
    pub async fn start(self) -> Result<ServerHandle, ListenerError> {
        let listener = listener::bind(&self.bind_address).await?;
        let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;

        let tracker = InFlightTracker::new();
        let (forced_tx, forced_rx) = watch::channel(false);
        let state = AppState {
            status: self.status.clone(),
            tracker: tracker.clone(),
            forced: forced_rx,
        };
        let app = self.build_router(state);

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            tracing::info!(address = %local_addr, "HTTP server starting");
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    // A dropped sender also stops accepting.
                    let _ = stop_rx.await;
                })
                .await
        });

        Ok(ServerHandle {
            local_addr,
            tracker,
            stop: Some(stop_tx),
            forced: forced_tx,
            task,
            finished: false,
        })
    }
}

/// Handle to a running HTTP server.
pub struct ServerHandle {
    local_addr: SocketAddr,
    tracker: InFlightTracker,
    stop: Option<oneshot::Sender<()>>,
    forced: watch::Sender<bool>,
    task: JoinHandle<std::io::Result<()>>,
    finished: bool,
}

impl ServerHandle {
    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl ServeHandle for ServerHandle {
    fn stop_accepting(&mut self) {
        if let Some(stop) = self.stop.take() {
            tracing::info!(in_flight = self.tracker.active_count(), "HTTP server no longer accepting");
            let _ = stop.send(());
        }
    }

    fn drained(&mut self) -> impl Future<Output = ()> + Send + '_ {
        async move {
            if self.finished {
                return;
            }
            self.tracker.wait_idle().await;
            tracing::debug!("In-flight requests finished, waiting for connections to close");

            let result = (&mut self.task).await;
            self.finished = true;
            match result {
                Ok(Ok(())) => tracing::info!("HTTP server stopped"),
                Ok(Err(e)) => tracing::error!(error = %e, "HTTP server exited with error"),
                Err(e) if e.is_cancelled() => {}
                Err(e) => tracing::error!(error = %e, "HTTP server task panicked"),
            }
        }
    }

    fn force_close(&mut self) {
        tracing::warn!(in_flight = self.tracker.active_count(), "Forcing HTTP server closed");
        let _ = self.forced.send(true);
        self.task.abort();
    }
}

/// Count the request as in flight; cut it short if the server is forced closed.
async fn track_in_flight(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let guard = state.tracker.track();
    let mut forced = state.forced.clone();

    let response = tokio::select! {
        response = next.run(request) => response,
        _ = wait_forced(&mut forced) => {
            tracing::warn!(id = %guard.id(), "Request aborted by forced shutdown");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    };

    drop(guard);
    response
}

async fn wait_forced(forced: &mut watch::Receiver<bool>) {
    if forced.wait_for(|forced| *forced).await.is_err() {
        // Sender gone: the handle was dropped without forcing.
        std::future::pending::<()>().await;
    }
}
