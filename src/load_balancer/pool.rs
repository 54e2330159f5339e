//! Backend pool management.
//!
//! # Responsibilities
//! - Own the ordered backends of one service
//! - Publish the active snapshot (healthy backends, pool order)
//! - Serve lock-free snapshot reads on the request path

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;

use crate::load_balancer::{backend::Backend, LbError};

/// The set of backends currently eligible for selection.
pub type Snapshot = Arc<Vec<Arc<Backend>>>;

/// Ordered backends of one service plus the derived active snapshot.
///
/// The snapshot is replaced as a whole on every publish and never mutated in
/// place, so a reader sees either the previous or the next set.
#[derive(Debug)]
pub struct BackendPool {
    backends: Vec<Arc<Backend>>,
    active: ArcSwap<Vec<Arc<Backend>>>,
    /// Serialises publishers so snapshot updates are totally ordered.
    publish: Mutex<()>,
}

impl BackendPool {
    /// Build a pool from target URLs, in the given order.
    ///
    /// Until the first publish the active snapshot is the whole pool.
    pub fn new<S: AsRef<str>>(targets: &[S]) -> Result<Self, LbError> {
        let backends = targets
            .iter()
            .enumerate()
            .map(|(id, target)| Backend::new(id, target.as_ref()).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            active: ArcSwap::from_pointee(backends.clone()),
            backends,
            publish: Mutex::new(()),
        })
    }

    /// All backends, in pool order.
    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Current active snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.active.load_full()
    }

    /// Apply health verdicts keyed by backend id and swap in the new snapshot.
    ///
    /// Backends missing from `results` keep their previous verdict.
    pub fn publish_health(&self, results: &HashMap<usize, bool>) {
        let _guard = self
            .publish
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        for backend in &self.backends {
            if let Some(&healthy) = results.get(&backend.id()) {
                backend.set_healthy(healthy);
            }
        }

        let active: Vec<Arc<Backend>> = self
            .backends
            .iter()
            .filter(|b| b.is_healthy())
            .cloned()
            .collect();

        tracing::debug!(
            active = active.len(),
            total = self.backends.len(),
            "Published backend health"
        );
        self.active.store(Arc::new(active));
    }
}
