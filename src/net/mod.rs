//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Configured address
//!     → listener.rs (bind; failure is fatal)
//!     → HTTP layer spawns the accept/serve loop
//!     → connection.rs (in-flight tracking for drain)
//! ```
//!
//! # Design Decisions
//! - Binding happens before the serve loop is spawned, so readiness probes
//!   never race an unbound port
//! - The running loop is exposed only through `ServeHandle`

pub mod connection;
pub mod listener;

pub use connection::{InFlightGuard, InFlightTracker};
pub use listener::{bind, ListenerError, ServeHandle};
