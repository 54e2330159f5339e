//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Service start → pool.rs (parse targets, full pool active)
//!
//! Health tick → pool.rs publish_health (atomic snapshot swap)
//!
//! Request → selector.rs
//!     → pool.rs snapshot (lock-free read)
//!     → Apply load balancing algorithm:
//!         - round_robin.rs (rotate through active backends)
//!         - random.rs (uniform pick)
//!     → Backend, or NoHealthyBackend (503 upstream of here)
//! ```
//!
//! # Design Decisions
//! - Strategies only ever see the active snapshot, never the whole pool
//! - The health checker is the single writer of the snapshot
//! - Algorithm tags are validated when the selector is built

pub mod backend;
pub mod pool;
pub mod random;
pub mod round_robin;
pub mod selector;

use std::sync::Arc;

pub use backend::{Backend, HealthState};
pub use pool::BackendPool;
pub use selector::{Algorithm, Selector};

/// A backend selection strategy.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    /// Choose one backend from `backends`, or `None` when it is empty.
    fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>>;
}

/// Errors raised while building or selecting from a pool.
#[derive(Debug, thiserror::Error)]
pub enum LbError {
    #[error("invalid backend target `{target}`: {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("invalid load balancing algorithm `{0}` (expected `random` or `round-robin`)")]
    InvalidAlgorithm(String),

    #[error("no healthy backend available")]
    NoHealthyBackend,
}
