//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection (one listener per service)
//!     → server.rs (axum-server setup, connection timeouts)
//!     → middleware/ (request id, access log, header rule, rewrite, auth)
//!     → proxy.rs (pick backend, forward, stream back)
//!       or ServeDir (file server)
//!     → Send to client
//! ```

pub mod middleware;
pub mod proxy;
pub mod server;

pub use proxy::{ForwardError, ForwardingProxy};
pub use server::{HttpServer, ServiceError};
