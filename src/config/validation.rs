//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Enforce one-of sections (proxy vs. file server, basic vs. key auth)
//! - Validate value ranges (health interval > 0) and filesystem paths
//! - Detect services competing for the same listen address
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Output is the typed `ServiceSpec` list, so nothing downstream re-checks
//! - Checks needing runtime types (URLs, algorithm tags, header syntax) are
//!   left to service construction, where a failure only stops that service

use std::collections::HashSet;
use std::path::PathBuf;

use crate::config::schema::GatewayConfig;
use crate::config::service::ServiceSpec;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("no services configured")]
    NoServices,

    #[error("a service has an empty `source`")]
    MissingSource,

    #[error("service {0}: duplicate `source`")]
    DuplicateSource(String),

    #[error("service {service}: exactly one of `reverse_proxy` or `fs` must be set, found both")]
    ConflictingModes { service: String },

    #[error("service {service}: one of `reverse_proxy` or `fs` must be set")]
    MissingMode { service: String },

    #[error("service {service}: `reverse_proxy.targets` must not be empty")]
    NoTargets { service: String },

    #[error("service {service}: `health_check.interval_s` must be greater than zero")]
    ZeroHealthInterval { service: String },

    #[error("service {service}: header `{header}` is both added and removed")]
    HeaderConflict { service: String, header: String },

    #[error("service {service}: `fs.path` {path:?} is not a directory")]
    NotADirectory { service: String, path: PathBuf },

    #[error("service {service}: only one of `auth.key_auth` or `auth.basic_auth` may be set")]
    ConflictingAuth { service: String },

    #[error("service {service}: `auth` is present but configures no method")]
    EmptyAuth { service: String },

    #[error("service {service}: `tls.cert_path` and `tls.key_path` are required when TLS is enabled")]
    MissingTlsMaterial { service: String },
}

/// Validate every service and convert it into its typed form.
pub fn validate_config(config: &GatewayConfig) -> Result<Vec<ServiceSpec>, Vec<ValidationError>> {
    if config.services.is_empty() {
        return Err(vec![ValidationError::NoServices]);
    }

    let mut errors = Vec::new();
    let mut specs = Vec::with_capacity(config.services.len());
    let mut sources = HashSet::new();

    for service in &config.services {
        match ServiceSpec::try_from(service) {
            Ok(spec) => {
                if !sources.insert(spec.source.clone()) {
                    errors.push(ValidationError::DuplicateSource(spec.source.clone()));
                }
                specs.push(spec);
            }
            Err(mut service_errors) => errors.append(&mut service_errors),
        }
    }

    if errors.is_empty() {
        Ok(specs)
    } else {
        Err(errors)
    }
}
