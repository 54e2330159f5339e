//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::{GatewayConfig, ObservabilityConfig, ServiceConfig};
use crate::config::service::ServiceSpec;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// On-disk configuration syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Toml,
}

impl Format {
    /// `.json` files are JSON; everything else is read as TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Toml,
        }
    }
}

/// A validated configuration, ready to start services from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub observability: ObservabilityConfig,
    pub services: Vec<ServiceSpec>,
}

/// Load and validate configuration from a JSON or TOML file.
pub fn load_config(path: &Path) -> Result<LoadedConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content, Format::from_path(path))
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str, format: Format) -> Result<LoadedConfig, ConfigError> {
    let config: GatewayConfig = match format {
        Format::Toml => toml::from_str(content)?,
        Format::Json => parse_json(content)?,
    };

    let services = validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(LoadedConfig {
        observability: config.observability,
        services,
    })
}

/// JSON accepts either the full document or a bare array of services.
fn parse_json(content: &str) -> Result<GatewayConfig, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(content)?;
    if value.is_array() {
        let services: Vec<ServiceConfig> = serde_json::from_value(value)?;
        Ok(GatewayConfig {
            services,
            ..Default::default()
        })
    } else {
        serde_json::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::service::{AuthMode, ServiceMode};
    use std::time::Duration;

    #[test]
    fn parses_json_service_array() {
        let json = r#"[
            {
                "source": ":8080",
                "reverse_proxy": {
                    "targets": ["http://127.0.0.1:3000", "http://127.0.0.1:3001"],
                    "lb_algorithm": "round-robin",
                    "health_check": { "enabled": true, "path": "/ping", "interval_s": 2 }
                },
                "header": { "add": { "X-Test": "1" }, "remove": ["Server"] },
                "rewrite": { "/old": "/new" },
                "auth": { "key_auth": { "key": "k", "header": "X-Key" } },
                "timeout": { "read_s": 5, "write_s": 0, "idle_s": 60 }
            }
        ]"#;

        let loaded = parse_config(json, Format::Json).unwrap();
        assert_eq!(loaded.observability.log_level, "info");
        let spec = &loaded.services[0];
        assert_eq!(spec.source, "0.0.0.0:8080");

        let ServiceMode::ReverseProxy(proxy) = &spec.mode else {
            panic!("expected reverse proxy mode");
        };
        assert_eq!(proxy.algorithm, "round-robin");
        let hc = proxy.health_check.as_ref().unwrap();
        assert_eq!(hc.path, "/ping");
        assert_eq!(hc.interval, Duration::from_secs(2));
        assert_eq!(hc.timeout, Duration::from_secs(5));

        assert_eq!(spec.header.add.get("X-Test").map(String::as_str), Some("1"));
        assert_eq!(spec.rewrite.get("/old").map(String::as_str), Some("/new"));
        assert!(matches!(spec.auth, Some(AuthMode::SharedKey { .. })));
        assert_eq!(spec.timeouts.read, Some(Duration::from_secs(5)));
        assert_eq!(spec.timeouts.write, None);
    }

    #[test]
    fn parses_toml_document() {
        let toml = r#"
            [observability]
            log_level = "debug"

            [[services]]
            source = "127.0.0.1:8081"
            fs = { path = "." }

            [services.auth.basic_auth]
            alice = "$2b$04$abcdefghijklmnopqrstuu"
        "#;

        let loaded = parse_config(toml, Format::Toml).unwrap();
        assert_eq!(loaded.observability.log_level, "debug");
        let spec = &loaded.services[0];
        assert!(matches!(spec.mode, ServiceMode::FileServer { .. }));
        assert!(matches!(&spec.auth, Some(AuthMode::Basic(users)) if users.contains_key("alice")));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let json = r#"[{ "source": ":1", "fs": { "path": "." }, "bogus": true }]"#;
        assert!(matches!(parse_config(json, Format::Json), Err(ConfigError::Json(_))));
    }

    #[test]
    fn validation_errors_are_reported() {
        let json = r#"{ "services": [{ "source": ":1" }] }"#;
        let err = parse_config(json, Format::Json).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
        assert!(err.to_string().contains("one of `reverse_proxy` or `fs`"));
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(Format::from_path(Path::new("config.json")), Format::Json);
        assert_eq!(Format::from_path(Path::new("gateway.toml")), Format::Toml);
    }
}
