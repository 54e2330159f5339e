//! Validated, typed form of one service's configuration.
//!
//! Produced by `validation.rs`; consumed by `http::server::HttpServer`.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::schema::{
    AuthConfig, HealthCheckConfig, HeaderConfig, ServiceConfig, TimeoutConfig, TlsConfig,
};
use crate::config::validation::ValidationError;

/// Everything needed to run one service.
#[derive(Debug, Clone)]
pub struct ServiceSpec {
    /// Listen address as configured (after `:port` normalisation).
    pub source: String,
    pub mode: ServiceMode,
    pub header: HeaderSpec,
    pub rewrite: BTreeMap<String, String>,
    pub auth: Option<AuthMode>,
    pub timeouts: Timeouts,
    pub tls: Option<TlsSpec>,
}

/// What answers requests once the middleware pipeline lets them through.
#[derive(Debug, Clone)]
pub enum ServiceMode {
    ReverseProxy(ProxySpec),
    FileServer { root: PathBuf },
}

#[derive(Debug, Clone)]
pub struct ProxySpec {
    pub targets: Vec<String>,
    /// Algorithm tag; parsed when the selector is built.
    pub algorithm: String,
    pub health_check: Option<HealthCheckSpec>,
}

#[derive(Debug, Clone)]
pub struct HealthCheckSpec {
    pub path: String,
    pub interval: Duration,
    pub timeout: Duration,
}

/// Response header rule as configured.
#[derive(Debug, Clone, Default)]
pub struct HeaderSpec {
    pub add: BTreeMap<String, String>,
    pub remove: Vec<String>,
}

/// Exactly one authentication method.
#[derive(Debug, Clone)]
pub enum AuthMode {
    /// Username → bcrypt hash.
    Basic(BTreeMap<String, String>),
    SharedKey { header: String, key: String },
}

/// Listener timeouts. `None` (configured as 0) disables the bound.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub read: Option<Duration>,
    pub write: Option<Duration>,
    pub idle: Option<Duration>,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::from(&TimeoutConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct TlsSpec {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl ServiceSpec {
    /// A reverse-proxy service with default policies.
    pub fn reverse_proxy(source: impl Into<String>, targets: Vec<String>) -> Self {
        Self::with_mode(
            source,
            ServiceMode::ReverseProxy(ProxySpec {
                targets,
                algorithm: "random".to_string(),
                health_check: None,
            }),
        )
    }

    /// A file-server service with default policies.
    pub fn file_server(source: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self::with_mode(source, ServiceMode::FileServer { root: root.into() })
    }

    fn with_mode(source: impl Into<String>, mode: ServiceMode) -> Self {
        Self {
            source: normalize_source(&source.into()),
            mode,
            header: HeaderSpec::default(),
            rewrite: BTreeMap::new(),
            auth: None,
            timeouts: Timeouts::default(),
            tls: None,
        }
    }
}

/// `":8080"` means every interface.
pub fn normalize_source(source: &str) -> String {
    if source.starts_with(':') {
        format!("0.0.0.0{}", source)
    } else {
        source.to_string()
    }
}

impl TryFrom<&ServiceConfig> for ServiceSpec {
    type Error = Vec<ValidationError>;

    fn try_from(config: &ServiceConfig) -> Result<Self, Self::Error> {
        let service = config.source.clone();
        let mut errors = Vec::new();

        if config.source.trim().is_empty() {
            errors.push(ValidationError::MissingSource);
        }

        let mode = match (&config.reverse_proxy, &config.fs) {
            (Some(_), Some(_)) => {
                errors.push(ValidationError::ConflictingModes { service: service.clone() });
                None
            }
            (None, None) => {
                errors.push(ValidationError::MissingMode { service: service.clone() });
                None
            }
            (Some(rp), None) => {
                if rp.targets.is_empty() {
                    errors.push(ValidationError::NoTargets { service: service.clone() });
                }
                let health_check = health_check_spec(&service, &rp.health_check, &mut errors);
                Some(ServiceMode::ReverseProxy(ProxySpec {
                    targets: rp.targets.clone(),
                    algorithm: rp.lb_algorithm.clone(),
                    health_check,
                }))
            }
            (None, Some(fs)) => {
                if !fs.path.is_dir() {
                    errors.push(ValidationError::NotADirectory {
                        service: service.clone(),
                        path: fs.path.clone(),
                    });
                }
                Some(ServiceMode::FileServer { root: fs.path.clone() })
            }
        };

        let header = config
            .header
            .as_ref()
            .map(|h| header_spec(&service, h, &mut errors))
            .unwrap_or_default();

        let auth = config
            .auth
            .as_ref()
            .and_then(|a| auth_mode(&service, a, &mut errors));

        let tls = config
            .tls
            .as_ref()
            .and_then(|t| tls_spec(&service, t, &mut errors));

        match mode {
            Some(mode) if errors.is_empty() => Ok(Self {
                source: normalize_source(&config.source),
                mode,
                header,
                rewrite: config.rewrite.clone(),
                auth,
                timeouts: Timeouts::from(&config.timeout),
                tls,
            }),
            _ => Err(errors),
        }
    }
}

fn health_check_spec(
    service: &str,
    config: &HealthCheckConfig,
    errors: &mut Vec<ValidationError>,
) -> Option<HealthCheckSpec> {
    if !config.enabled {
        return None;
    }
    if config.interval_s == 0 {
        errors.push(ValidationError::ZeroHealthInterval { service: service.to_string() });
        return None;
    }
    let timeout_s = if config.timeout_s == 0 { 5 } else { config.timeout_s };
    Some(HealthCheckSpec {
        path: config.path.clone(),
        interval: Duration::from_secs(config.interval_s),
        timeout: Duration::from_secs(timeout_s),
    })
}

fn header_spec(
    service: &str,
    config: &HeaderConfig,
    errors: &mut Vec<ValidationError>,
) -> HeaderSpec {
    for removed in &config.remove {
        if config.add.keys().any(|added| added.eq_ignore_ascii_case(removed)) {
            errors.push(ValidationError::HeaderConflict {
                service: service.to_string(),
                header: removed.clone(),
            });
        }
    }
    HeaderSpec {
        add: config.add.clone(),
        remove: config.remove.clone(),
    }
}

fn auth_mode(
    service: &str,
    config: &AuthConfig,
    errors: &mut Vec<ValidationError>,
) -> Option<AuthMode> {
    match (&config.key_auth, &config.basic_auth) {
        (Some(key), None) => Some(AuthMode::SharedKey {
            header: key.header.clone(),
            key: key.key.clone(),
        }),
        (None, Some(users)) => Some(AuthMode::Basic(users.clone())),
        (Some(_), Some(_)) => {
            errors.push(ValidationError::ConflictingAuth { service: service.to_string() });
            None
        }
        (None, None) => {
            errors.push(ValidationError::EmptyAuth { service: service.to_string() });
            None
        }
    }
}

fn tls_spec(
    service: &str,
    config: &TlsConfig,
    errors: &mut Vec<ValidationError>,
) -> Option<TlsSpec> {
    if !config.enabled {
        return None;
    }
    if config.cert_path.is_empty() || config.key_path.is_empty() {
        errors.push(ValidationError::MissingTlsMaterial { service: service.to_string() });
        return None;
    }
    Some(TlsSpec {
        cert_path: PathBuf::from(&config.cert_path),
        key_path: PathBuf::from(&config.key_path),
    })
}

impl From<&TimeoutConfig> for Timeouts {
    fn from(config: &TimeoutConfig) -> Self {
        let secs = |s: u64| (s > 0).then(|| Duration::from_secs(s));
        Self {
            read: secs(config.read_s),
            write: secs(config.write_s),
            idle: secs(config.idle_s),
        }
    }
}
