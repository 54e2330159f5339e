//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → Probe every backend concurrently (GET {target}{path})
//!     → Wait for all probes of the tick (each bounded by the timeout)
//!     → BackendPool::publish_health (one atomic snapshot swap)
//! ```
//!
//! # Design Decisions
//! - Only HTTP 200 counts as healthy; every failure is recovered as unhealthy
//! - One verdict per tick, no hysteresis: a backend leaves after one failed
//!   tick and returns after one successful tick
//! - The checker lives as long as its service and stops on shutdown

pub mod active;

pub use active::{HealthChecker, ProbeOutcome};
