//! Configuration schema definitions.
//!
//! This module defines the on-disk configuration structure for the gateway.
//! All types derive Serde traits for deserialization from JSON or TOML files.
//! One-of sections are plain `Option`s here; `service.rs` turns them into
//! tagged variants once validated.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    /// Independently configured services.
    pub services: Vec<ServiceConfig>,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// One service: a listen address plus how to answer requests on it.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Listen address (e.g., "127.0.0.1:8080" or ":8080").
    pub source: String,

    /// Reverse-proxy mode. Mutually exclusive with `fs`.
    #[serde(default)]
    pub reverse_proxy: Option<ReverseProxyConfig>,

    /// File-server mode. Mutually exclusive with `reverse_proxy`.
    #[serde(default)]
    pub fs: Option<FsConfig>,

    /// Response header additions and removals.
    #[serde(default)]
    pub header: Option<HeaderConfig>,

    /// Exact request path → replacement path.
    #[serde(default)]
    pub rewrite: BTreeMap<String, String>,

    #[serde(default)]
    pub auth: Option<AuthConfig>,

    #[serde(default)]
    pub timeout: TimeoutConfig,

    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

/// Reverse-proxy settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ReverseProxyConfig {
    /// Backend base URLs, in round-robin order.
    pub targets: Vec<String>,

    /// "random" or "round-robin".
    #[serde(default = "default_algorithm")]
    pub lb_algorithm: String,

    #[serde(default)]
    pub health_check: HealthCheckConfig,
}

fn default_algorithm() -> String {
    "random".to_string()
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct HealthCheckConfig {
    /// Enable active health checks.
    pub enabled: bool,

    /// Path to probe, appended to each target URL.
    pub path: String,

    /// Health check interval in seconds.
    pub interval_s: u64,

    /// Health check timeout in seconds.
    pub timeout_s: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: "/".to_string(),
            interval_s: 0,
            timeout_s: 5,
        }
    }
}

/// Response header rules.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct HeaderConfig {
    /// Headers to set, overwriting existing values.
    pub add: BTreeMap<String, String>,

    /// Headers to remove.
    pub remove: Vec<String>,
}

/// Static file serving.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FsConfig {
    /// Directory to serve.
    pub path: PathBuf,
}

/// Authentication settings. Exactly one method may be set.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    pub key_auth: Option<KeyAuthConfig>,

    /// Username → bcrypt password hash.
    pub basic_auth: Option<BTreeMap<String, String>>,
}

/// Shared-key authentication.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KeyAuthConfig {
    /// Expected header value.
    pub key: String,

    /// Header carrying the key.
    pub header: String,
}

/// Timeout configuration for downstream connections.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutConfig {
    /// Time allowed to read a request head, in seconds.
    pub read_s: u64,

    /// Time allowed to produce a response head, in seconds.
    pub write_s: u64,

    /// Idle keep-alive timeout, in seconds.
    pub idle_s: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read_s: 30,
            write_s: 30,
            idle_s: 120,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct TlsConfig {
    pub enabled: bool,

    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
