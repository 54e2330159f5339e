//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Downstream:
//!     listener.rs (bind per service)
//!     → tls.rs (optional certificate loading)
//!     → Hand off to HTTP layer
//!
//! Upstream:
//!     client.rs (pooled http/https client)
//!     → used by forwarding and health probes
//! ```
//!
//! # Design Decisions
//! - Each service binds its own listener; a bind failure is that service's alone
//! - TLS is optional and handled transparently by the server acceptor

pub mod client;
pub mod listener;
pub mod tls;

pub use client::{build_client, UpstreamClient};
pub use listener::ListenerError;
