//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated services → one task each → build, bind, serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → stop accepting, drain, exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - A service failure is logged and isolated; the others keep serving
//! - Shutdown has a drain deadline per service

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{Gateway, GatewayReport};
