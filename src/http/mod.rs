//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, in-flight tracking)
//!     → request.rs (request ID)
//!     → handlers.rs (/health, /status, /api/time, /sleep/{millis}, /)
//! ```

pub mod handlers;
pub mod request;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{HttpServer, ServerHandle};
