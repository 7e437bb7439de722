//! Reload harness library.
//!
//! A minimal HTTP process for reproducing hot-reload supervisor timing
//! problems: it measures how long it takes to answer its own health check
//! and shuts down within a bounded drain window.

pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::schema::HarnessConfig;
pub use error::HarnessError;
pub use http::HttpServer;
pub use lifecycle::{DrainOutcome, ProcessSupervisor, SupervisorSettings};
