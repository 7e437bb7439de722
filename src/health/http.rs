//! HTTP health check against the local listener.
//!
//! # Responsibilities
//! - Issue a single `GET <path>` per attempt
//! - Map the exchange to pass/fail (2xx passes; refused, timeout, non-2xx fail)

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time;

/// One-request health check. Cheap to clone; clones share the client.
#[derive(Clone)]
pub struct HttpHealthCheck {
    client: Client<HttpConnector, Body>,
    uri: Uri,
    timeout: Duration,
}

impl HttpHealthCheck {
    /// Build a check for `path` on `addr`.
    ///
    /// Unspecified addresses (`0.0.0.0`, `::`) are probed via loopback.
    pub fn new(addr: SocketAddr, path: &str, timeout: Duration) -> Result<Self, axum::http::Error> {
        let target = probe_target(addr);
        let uri = Uri::builder()
            .scheme("http")
            .authority(target.to_string())
            .path_and_query(path)
            .build()?;

        // No pooling: an idle keep-alive connection would count as in-flight
        // work during drain.
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build(HttpConnector::new());

        Ok(Self {
            client,
            uri,
            timeout,
        })
    }

    /// Full URI requested on every attempt.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Perform one attempt. Never errors; every failure is `false`.
    pub async fn check(&self) -> bool {
        let request = match Request::builder()
            .method("GET")
            .uri(self.uri.clone())
            .header("user-agent", "reload-harness-readiness")
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!("Failed to build health check request: {}", e);
                return false;
            }
        };

        match time::timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let success = response.status().is_success();
                if !success {
                    tracing::debug!(uri = %self.uri, status = %response.status(), "Health check failed: non-success status");
                }
                success
            }
            Ok(Err(e)) => {
                tracing::debug!(uri = %self.uri, error = %e, "Health check failed: connection error");
                false
            }
            Err(_) => {
                tracing::debug!(uri = %self.uri, "Health check failed: timeout");
                false
            }
        }
    }
}

fn probe_target(addr: SocketAddr) -> SocketAddr {
    if !addr.ip().is_unspecified() {
        return addr;
    }
    let loopback = if addr.is_ipv4() {
        std::net::Ipv4Addr::LOCALHOST.into()
    } else {
        std::net::Ipv6Addr::LOCALHOST.into()
    };
    SocketAddr::new(loopback, addr.port())
}
