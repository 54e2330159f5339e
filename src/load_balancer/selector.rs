//! Backend selection over a pool's active snapshot.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::load_balancer::{
    backend::Backend, pool::BackendPool, random::Random, round_robin::RoundRobin, LbError,
    LoadBalancer,
};

/// Supported selection algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    RoundRobin,
    Random,
}

impl FromStr for Algorithm {
    type Err = LbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "round-robin" => Ok(Algorithm::RoundRobin),
            "random" => Ok(Algorithm::Random),
            other => Err(LbError::InvalidAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::RoundRobin => f.write_str("round-robin"),
            Algorithm::Random => f.write_str("random"),
        }
    }
}

/// Stateful selector bound to one algorithm.
///
/// The algorithm tag is validated once here, never per request.
#[derive(Debug)]
pub struct Selector {
    algorithm: Algorithm,
    strategy: Box<dyn LoadBalancer>,
}

impl Selector {
    pub fn new(algorithm: Algorithm) -> Self {
        let strategy: Box<dyn LoadBalancer> = match algorithm {
            Algorithm::RoundRobin => Box::new(RoundRobin::new()),
            Algorithm::Random => Box::new(Random::new()),
        };
        Self { algorithm, strategy }
    }

    /// Build a selector from a configuration tag such as `"round-robin"`.
    pub fn from_tag(tag: &str) -> Result<Self, LbError> {
        Ok(Self::new(tag.parse()?))
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Pick one backend from the pool's current active snapshot.
    pub fn select(&self, pool: &BackendPool) -> Result<Arc<Backend>, LbError> {
        let snapshot = pool.snapshot();
        self.strategy
            .next_server(&snapshot)
            .ok_or(LbError::NoHealthyBackend)
    }
}
