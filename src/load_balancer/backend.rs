//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream target of one service
//! - Pre-compute the pieces of the target URL needed on every request
//! - Track the last health verdict published by the health checker

use std::sync::atomic::{AtomicU8, Ordering};
use url::Url;

use crate::load_balancer::LbError;

/// Health State enum.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    /// No probe has completed yet. Treated as healthy (fail-open).
    Unknown = 0,
    Healthy = 1,
    Unhealthy = 2,
}

impl From<u8> for HealthState {
    fn from(val: u8) -> Self {
        match val {
            1 => HealthState::Healthy,
            2 => HealthState::Unhealthy,
            _ => HealthState::Unknown,
        }
    }
}

/// A single backend server.
#[derive(Debug)]
pub struct Backend {
    /// Position of this backend in its pool. Stable for the pool's lifetime.
    id: usize,
    /// The configured target URL.
    url: Url,
    /// `host[:port]`, used for the upstream URI and the `Host` header.
    authority: String,
    /// Target URL without a trailing slash, used in logs and metric labels.
    base: String,
    /// Current health state (0=Unknown, 1=Healthy, 2=Unhealthy).
    state: AtomicU8,
}

impl Backend {
    /// Parse a target URL into a backend.
    ///
    /// Only absolute `http` and `https` URLs with a host are accepted.
    pub fn new(id: usize, target: &str) -> Result<Self, LbError> {
        let invalid = |reason: &str| LbError::InvalidTarget {
            target: target.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(target).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        let host = url.host_str().ok_or_else(|| invalid("missing host"))?;
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let base = url.as_str().trim_end_matches('/').to_string();

        Ok(Self {
            id,
            url,
            authority,
            base,
            state: AtomicU8::new(HealthState::Unknown as u8),
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// The target URL with any trailing slash removed.
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn state(&self) -> HealthState {
        HealthState::from(self.state.load(Ordering::Acquire))
    }

    /// Return true if backend is considered healthy (Healthy or Unknown).
    pub fn is_healthy(&self) -> bool {
        self.state() != HealthState::Unhealthy
    }

    /// Record a health verdict. Only the owning pool calls this.
    pub(crate) fn set_healthy(&self, healthy: bool) {
        let state = if healthy {
            HealthState::Healthy
        } else {
            HealthState::Unhealthy
        };
        self.state.store(state as u8, Ordering::Release);
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.base)
    }
}
