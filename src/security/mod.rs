//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Request about to be forwarded:
//!     → headers.rs (strip hop-by-hop, add X-Forwarded-*)
//!     → Upstream
//!
//! Upstream response:
//!     → headers.rs (strip hop-by-hop)
//!     → Client
//! ```
//!
//! Authentication lives in `http::middleware::auth`, since it is a pipeline stage.

pub mod headers;
