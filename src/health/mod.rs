//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Supervisor starts listener
//!     → http.rs builds a one-shot GET against the bound address
//!     → probe.rs runs it until success or the attempt budget is spent
//!     → ReadinessResult handed back to the supervisor
//! ```
//!
//! # Design Decisions
//! - The probe is generic over any async predicate, so tests and the CLI
//!   reuse it without a network
//! - Failed attempts are data, not errors

pub mod http;
pub mod probe;

pub use http::HttpHealthCheck;
pub use probe::{ReadinessProbe, ReadinessResult};
