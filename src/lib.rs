//! Gatehouse: a multi-service HTTP gateway.
//!
//! Each configured service gets its own listener and one terminal handler,
//! either a load-balanced reverse proxy or a static file server, wrapped in
//! a fixed pipeline of request-id, access log, header rule, rewrite and auth.
//!
//! ```text
//!     Client ──▶ net::listener ──▶ http::server ──▶ http::middleware ──▶ http::proxy ──▶ Backend
//!                                                                    └─▶ ServeDir
//!
//!     health::active ──(publish)──▶ load_balancer::pool ◀──(snapshot)── load_balancer::selector
//! ```

// Core subsystems
pub mod config;
pub mod http;
pub mod net;

// Traffic management
pub mod health;
pub mod load_balancer;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::{load_config, LoadedConfig, ServiceSpec};
pub use http::HttpServer;
pub use lifecycle::{Gateway, Shutdown};
