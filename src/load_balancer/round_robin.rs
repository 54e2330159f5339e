//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::{backend::Backend, LoadBalancer};

/// Round-robin selector.
/// Stores an internal counter to rotate through the active snapshot.
///
/// The counter keeps advancing across health changes; it is reduced modulo
/// the length of whatever snapshot the call observes.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for RoundRobin {
    fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        if backends.is_empty() {
            return None;
        }

        let count = self.counter.fetch_add(1, Ordering::Relaxed);
        backends.get(count % backends.len()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backends(n: usize) -> Vec<Arc<Backend>> {
        (0..n)
            .map(|i| Arc::new(Backend::new(i, &format!("http://127.0.0.1:{}", 8080 + i)).unwrap()))
            .collect()
    }

    #[test]
    fn test_round_robin() {
        let lb = RoundRobin::new();
        let backends = backends(2);

        let order: Vec<usize> = (0..4)
            .map(|_| lb.next_server(&backends).unwrap().id())
            .collect();
        assert_eq!(order, vec![0, 1, 0, 1]);
    }

    #[test]
    fn visits_each_backend_once_per_cycle() {
        for n in 1..=7 {
            let lb = RoundRobin::new();
            let backends = backends(n);
            let mut seen: Vec<usize> = (0..n)
                .map(|_| lb.next_server(&backends).unwrap().id())
                .collect();
            seen.sort_unstable();
            assert_eq!(seen, (0..n).collect::<Vec<_>>());
        }
    }

    #[test]
    fn renormalises_when_snapshot_shrinks() {
        let lb = RoundRobin::new();
        let all = backends(3);
        for _ in 0..5 {
            lb.next_server(&all);
        }

        let shrunk = vec![all[2].clone()];
        for _ in 0..3 {
            assert_eq!(lb.next_server(&shrunk).unwrap().id(), 2);
        }
        assert!(lb.next_server(&[]).is_none());
    }
}
