//! Per-service HTTP server.
//!
//! # Responsibilities
//! - Build the terminal handler (forwarding proxy or file server)
//! - Wrap it in the service's pipeline
//! - Own the service's health checker, if any
//! - Serve plain or TLS on a pre-bound listener until shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum_server::Handle;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::sync::broadcast;
use tower_http::services::ServeDir;

use crate::config::{ServiceMode, ServiceSpec, Timeouts};
use crate::health::HealthChecker;
use crate::http::middleware::{Pipeline, PipelineError};
use crate::http::proxy::{proxy_handler, ForwardingProxy};
use crate::load_balancer::{BackendPool, LbError};
use crate::net::tls::load_tls_config;
use crate::net::{build_client, ListenerError};

/// In-flight requests get this long to finish after shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a service could not start or stopped serving.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid backend setup: {0}")]
    Backend(#[from] LbError),

    #[error("invalid pipeline: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("TLS setup failed: {0}")]
    Tls(#[source] std::io::Error),

    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// One configured service, ready to serve.
pub struct HttpServer {
    spec: ServiceSpec,
    router: Router,
    pool: Option<Arc<BackendPool>>,
    health: Option<HealthChecker>,
}

impl HttpServer {
    pub fn new(spec: ServiceSpec) -> Result<Self, ServiceError> {
        let client = build_client(spec.timeouts.idle);

        let (terminal, pool, health) = match &spec.mode {
            ServiceMode::ReverseProxy(proxy) => {
                let forwarding = ForwardingProxy::new(
                    spec.source.clone(),
                    proxy,
                    client.clone(),
                    spec.timeouts.write,
                    spec.tls.is_some(),
                )?;
                let pool = forwarding.pool().cloned();
                let health = match (&pool, &proxy.health_check) {
                    (Some(pool), Some(check)) => Some(HealthChecker::new(
                        spec.source.clone(),
                        pool.clone(),
                        check.clone(),
                        client,
                    )),
                    _ => None,
                };
                let terminal = Router::new()
                    .fallback(proxy_handler)
                    .with_state(Arc::new(forwarding));
                (terminal, pool, health)
            }
            ServiceMode::FileServer { root } => {
                let files = ServeDir::new(root).append_index_html_on_directories(true);
                (Router::new().fallback_service(files), None, None)
            }
        };

        let router = Pipeline::from_spec(&spec)?.wrap(terminal);

        Ok(Self {
            spec,
            router,
            pool,
            health,
        })
    }

    pub fn source(&self) -> &str {
        &self.spec.source
    }

    /// The fully assembled router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// The balanced pool, for multi-target reverse proxies.
    pub fn pool(&self) -> Option<&Arc<BackendPool>> {
        self.pool.as_ref()
    }

    /// Serve on `listener` until `shutdown` fires, then drain.
    pub async fn run(
        self,
        listener: std::net::TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServiceError> {
        let Self {
            spec,
            router,
            health,
            ..
        } = self;

        let addr = listener.local_addr().map_err(ListenerError::Serve)?;
        tracing::info!(
            service = %spec.source,
            address = %addr,
            tls = spec.tls.is_some(),
            "Service starting"
        );

        let tls = match &spec.tls {
            Some(tls) => Some(load_tls_config(tls).await.map_err(ServiceError::Tls)?),
            None => None,
        };

        let checker = health.map(|checker| tokio::spawn(checker.run(shutdown.resubscribe())));

        let handle = Handle::new();
        let drain = handle.clone();
        let source = spec.source.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!(service = %source, "Draining connections");
            drain.graceful_shutdown(Some(DRAIN_TIMEOUT));
        });

        let app = router.into_make_service_with_connect_info::<SocketAddr>();
        let served = match tls {
            Some(config) => {
                let mut server = axum_server::from_tcp_rustls(listener, config).handle(handle);
                configure_connections(server.http_builder(), &spec.timeouts);
                server.serve(app).await
            }
            None => {
                let mut server = axum_server::from_tcp(listener).handle(handle);
                configure_connections(server.http_builder(), &spec.timeouts);
                server.serve(app).await
            }
        };

        if let Some(checker) = checker {
            checker.abort();
        }

        served.map_err(ListenerError::Serve)?;
        tracing::info!(service = %spec.source, "Service stopped");
        Ok(())
    }
}

/// Apply downstream read and idle bounds to accepted connections.
fn configure_connections(builder: &mut ConnBuilder<TokioExecutor>, timeouts: &Timeouts) {
    if let Some(read) = timeouts.read {
        builder
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(read);
    }
    if let Some(idle) = timeouts.idle {
        builder
            .http2()
            .timer(TokioTimer::new())
            .keep_alive_interval(idle);
    }
}
