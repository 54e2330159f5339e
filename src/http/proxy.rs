//! Forwarding proxy: the terminal handler of a reverse-proxy service.
//!
//! # Responsibilities
//! - Pick a backend (fixed, or through the selector over the active snapshot)
//! - Rewrite the request URI and `Host` for that backend
//! - Stream the request upstream and the response back
//! - Map failures onto 503 / 502 / 504

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request, StatusCode, Uri, Version},
    response::{IntoResponse, Response},
};
use hyper::body::Incoming;
use tokio::time;

use crate::config::ProxySpec;
use crate::load_balancer::{Backend, BackendPool, LbError, Selector};
use crate::net::UpstreamClient;
use crate::observability::metrics;
use crate::security::headers::{append_forwarded, strip_hop_by_hop};

#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("upstream did not answer in time")]
    Timeout,

    #[error("upstream request failed: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("could not build upstream request: {0}")]
    Build(#[from] axum::http::Error),

    #[error("invalid upstream host header: {0}")]
    Host(#[from] axum::http::header::InvalidHeaderValue),
}

impl ForwardError {
    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ForwardError::Timeout => "timeout",
            _ => "error",
        }
    }
}

#[derive(Debug)]
enum Upstream {
    /// One target: no selection, no health checking.
    Fixed(Arc<Backend>),
    Balanced {
        pool: Arc<BackendPool>,
        selector: Selector,
    },
}

#[derive(Debug)]
pub struct ForwardingProxy {
    service: String,
    upstream: Upstream,
    client: UpstreamClient,
    /// Deadline for the upstream response head.
    timeout: Option<Duration>,
    proto: &'static str,
}

impl ForwardingProxy {
    pub fn new(
        service: impl Into<String>,
        spec: &ProxySpec,
        client: UpstreamClient,
        timeout: Option<Duration>,
        tls: bool,
    ) -> Result<Self, LbError> {
        let upstream = match spec.targets.as_slice() {
            [single] => Upstream::Fixed(Arc::new(Backend::new(0, single)?)),
            targets => Upstream::Balanced {
                pool: Arc::new(BackendPool::new(targets)?),
                selector: Selector::from_tag(&spec.algorithm)?,
            },
        };

        Ok(Self {
            service: service.into(),
            upstream,
            client,
            timeout,
            proto: if tls { "https" } else { "http" },
        })
    }

    /// The balanced pool, if this proxy has more than one target.
    pub fn pool(&self) -> Option<&Arc<BackendPool>> {
        match &self.upstream {
            Upstream::Fixed(_) => None,
            Upstream::Balanced { pool, .. } => Some(pool),
        }
    }

    pub fn select(&self) -> Result<Arc<Backend>, LbError> {
        match &self.upstream {
            Upstream::Fixed(backend) => Ok(backend.clone()),
            Upstream::Balanced { pool, selector } => selector.select(pool),
        }
    }

    pub async fn handle(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let backend = match self.select() {
            Ok(backend) => backend,
            Err(e) => {
                tracing::warn!(service = %self.service, path = %path, error = %e, "No backend available");
                return (StatusCode::SERVICE_UNAVAILABLE, "No healthy backend available")
                    .into_response();
            }
        };

        match self.forward(&backend, request).await {
            Ok(response) => {
                tracing::debug!(
                    service = %self.service,
                    backend = %backend,
                    method = %method,
                    path = %path,
                    status = response.status().as_u16(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Forwarded request"
                );
                metrics::record_upstream(&self.service, backend.base(), "ok");
                response
            }
            Err(e) => {
                tracing::error!(
                    service = %self.service,
                    backend = %backend,
                    method = %method,
                    path = %path,
                    error = %e,
                    "Upstream request failed"
                );
                metrics::record_upstream(&self.service, backend.base(), e.label());
                let status = e.status();
                (status, status.canonical_reason().unwrap_or("Bad Gateway")).into_response()
            }
        }
    }

    async fn forward(&self, backend: &Backend, request: Request<Body>) -> Result<Response, ForwardError> {
        let client_ip = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        let (mut parts, body) = request.into_parts();

        let original_host = parts.headers.get(header::HOST).cloned().or_else(|| {
            parts
                .uri
                .authority()
                .and_then(|a| HeaderValue::from_str(a.as_str()).ok())
        });

        strip_hop_by_hop(&mut parts.headers);
        append_forwarded(&mut parts.headers, client_ip, original_host.as_ref(), self.proto);
        parts
            .headers
            .insert(header::HOST, HeaderValue::from_str(backend.authority())?);
        parts.uri = upstream_uri(backend, &parts.uri)?;
        parts.version = Version::HTTP_11;

        let pending = self.client.request(Request::from_parts(parts, body));
        let response: Response<Incoming> = match self.timeout {
            Some(limit) => time::timeout(limit, pending)
                .await
                .map_err(|_| ForwardError::Timeout)??,
            None => pending.await?,
        };

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

pub async fn proxy_handler(
    State(proxy): State<Arc<ForwardingProxy>>,
    request: Request<Body>,
) -> Response {
    proxy.handle(request).await
}

/// Target URI for `uri` on `backend`: scheme and authority from the backend,
/// paths joined with a single slash, queries concatenated.
fn upstream_uri(backend: &Backend, uri: &Uri) -> Result<Uri, axum::http::Error> {
    let target = backend.url();
    let path = join_paths(target.path(), uri.path());

    let path_and_query = match (target.query().filter(|q| !q.is_empty()), uri.query()) {
        (Some(base), Some(query)) => format!("{}?{}&{}", path, base, query),
        (Some(base), None) => format!("{}?{}", path, base),
        (None, Some(query)) => format!("{}?{}", path, query),
        (None, None) => path,
    };

    Uri::builder()
        .scheme(target.scheme())
        .authority(backend.authority())
        .path_and_query(path_and_query)
        .build()
}

fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}
