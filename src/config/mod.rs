//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (JSON/TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → service.rs ServiceSpec per service (validated, immutable)
//!     → one HttpServer per ServiceSpec
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; backend lists are fixed per process
//! - Most fields have defaults to allow minimal configs
//! - One-of sections become enums, so exclusivity is a type-level fact

pub mod loader;
pub mod schema;
pub mod service;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError, Format, LoadedConfig};
pub use schema::{GatewayConfig, ObservabilityConfig, ServiceConfig};
pub use service::{
    AuthMode, HeaderSpec, HealthCheckSpec, ProxySpec, ServiceMode, ServiceSpec, Timeouts, TlsSpec,
};
pub use validation::{validate_config, ValidationError};
