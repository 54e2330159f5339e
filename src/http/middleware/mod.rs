//! Per-service request pipeline.
//!
//! # Stage Order (outermost first)
//! ```text
//! request id (set, then propagate to the response)
//!     → access_log.rs (one event per request)
//!     → headers.rs   (response header rule, always present)
//!     → rewrite.rs   (only when rewrite rules exist)
//!     → auth.rs      (only when auth is configured)
//!     → terminal handler (forwarding proxy or file server)
//! ```
//!
//! The header rule sits outside auth so a 401 still carries the configured
//! response headers. The order is fixed at startup.

pub mod access_log;
pub mod auth;
pub mod headers;
pub mod rewrite;

use std::sync::Arc;

use axum::{middleware::from_fn_with_state, Router};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::config::ServiceSpec;

pub use access_log::access_log_middleware;
pub use auth::{auth_middleware, AuthConfigError, AuthError, AuthPolicy};
pub use headers::{header_rule_middleware, HeaderCommit, HeaderRule, HeaderRuleError, SERVER_NAME};
pub use rewrite::{rewrite_middleware, RewriteError, RewriteTable};

/// Stages assembled for one service.
#[derive(Debug, Clone)]
pub struct Pipeline {
    service: Arc<str>,
    headers: Arc<HeaderRule>,
    rewrite: Option<Arc<RewriteTable>>,
    auth: Option<Arc<AuthPolicy>>,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Header(#[from] HeaderRuleError),

    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    #[error(transparent)]
    Auth(#[from] AuthConfigError),
}

impl Pipeline {
    pub fn from_spec(spec: &ServiceSpec) -> Result<Self, PipelineError> {
        let headers = Arc::new(HeaderRule::new(&spec.header)?);

        let rewrite = if spec.rewrite.is_empty() {
            None
        } else {
            Some(Arc::new(RewriteTable::new(&spec.rewrite)?))
        };

        let auth = spec
            .auth
            .as_ref()
            .map(AuthPolicy::from_mode)
            .transpose()?
            .map(Arc::new);

        Ok(Self {
            service: Arc::from(spec.source.as_str()),
            headers,
            rewrite,
            auth,
        })
    }

    pub fn has_auth(&self) -> bool {
        self.auth.is_some()
    }

    pub fn has_rewrite(&self) -> bool {
        self.rewrite.is_some()
    }

    /// Wrap a terminal router. Layers added later run first.
    pub fn wrap(self, terminal: Router) -> Router {
        let mut router = terminal;

        if let Some(auth) = self.auth {
            router = router.layer(from_fn_with_state(auth, auth_middleware));
        }
        if let Some(rewrite) = self.rewrite {
            router = router.layer(from_fn_with_state(rewrite, rewrite_middleware));
        }

        router
            .layer(from_fn_with_state(self.headers, header_rule_middleware))
            .layer(from_fn_with_state(self.service, access_log_middleware))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }
}
