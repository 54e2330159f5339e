//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every backend of one pool, concurrently
//! - Classify each probe (only HTTP 200 is healthy)
//! - Publish the tick's verdicts to the pool in one swap

use std::collections::HashMap;
use std::error::Error as StdError;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode, Uri};
use futures_util::future::join_all;
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::config::HealthCheckSpec;
use crate::load_balancer::{Backend, BackendPool};
use crate::net::UpstreamClient;
use crate::observability::metrics;

/// Result of probing one backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The probe path answered 200.
    Healthy,
    /// Any status other than 200.
    BadStatus(StatusCode),
    /// No response within the probe timeout.
    Timeout,
    /// The backend refused the connection.
    Refused,
    /// Any other transport failure.
    Failed(String),
}

impl ProbeOutcome {
    pub fn is_healthy(&self) -> bool {
        matches!(self, ProbeOutcome::Healthy)
    }

    fn label(&self) -> &'static str {
        match self {
            ProbeOutcome::Healthy => "healthy",
            ProbeOutcome::BadStatus(_) => "bad_status",
            ProbeOutcome::Timeout => "timeout",
            ProbeOutcome::Refused => "refused",
            ProbeOutcome::Failed(_) => "failed",
        }
    }
}

/// Keeps a pool's active snapshot current.
pub struct HealthChecker {
    service: String,
    pool: Arc<BackendPool>,
    config: HealthCheckSpec,
    client: UpstreamClient,
}

impl HealthChecker {
    pub fn new(
        service: impl Into<String>,
        pool: Arc<BackendPool>,
        config: HealthCheckSpec,
        client: UpstreamClient,
    ) -> Self {
        Self {
            service: service.into(),
            pool,
            config,
            client,
        }
    }

    /// Probe on every interval until `shutdown` fires or its sender is dropped.
    ///
    /// The first tick runs immediately.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            service = %self.service,
            interval = ?self.config.interval,
            timeout = ?self.config.timeout,
            path = %self.config.path,
            backends = self.pool.len(),
            "Health checker starting"
        );

        let mut ticker = time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!(service = %self.service, "Health checker received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Run one tick: probe all backends, wait for every probe, then publish.
    pub async fn tick(&self) -> HashMap<usize, bool> {
        let probes = self.pool.backends().iter().map(|backend| async move {
            let outcome = self.probe(backend).await;
            (backend, outcome)
        });

        let mut results = HashMap::with_capacity(self.pool.len());
        for (backend, outcome) in join_all(probes).await {
            let healthy = outcome.is_healthy();
            if healthy != backend.is_healthy() {
                tracing::info!(
                    service = %self.service,
                    backend = %backend,
                    healthy,
                    "Backend health changed"
                );
            }
            metrics::record_probe(&self.service, backend.base(), outcome.label(), healthy);
            results.insert(backend.id(), healthy);
        }

        self.pool.publish_health(&results);
        results
    }

    /// Probe one backend. Never fails; every error is an unhealthy outcome.
    pub async fn probe(&self, backend: &Backend) -> ProbeOutcome {
        let url = health_url(backend, &self.config.path);

        let request = match url
            .parse::<Uri>()
            .map_err(|e| e.to_string())
            .and_then(|uri| {
                Request::builder()
                    .method("GET")
                    .uri(uri)
                    .header(header::USER_AGENT, "gatehouse-health-check")
                    .body(Body::empty())
                    .map_err(|e| e.to_string())
            }) {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(service = %self.service, url = %url, error = %e, "Failed to build health check request");
                return ProbeOutcome::Failed(e);
            }
        };

        let outcome = match time::timeout(self.config.timeout, self.client.request(request)).await {
            Ok(Ok(response)) if response.status() == StatusCode::OK => ProbeOutcome::Healthy,
            Ok(Ok(response)) => ProbeOutcome::BadStatus(response.status()),
            Ok(Err(e)) => classify_error(&e),
            Err(_) => ProbeOutcome::Timeout,
        };

        match &outcome {
            ProbeOutcome::Healthy => {}
            ProbeOutcome::BadStatus(status) => {
                tracing::warn!(service = %self.service, backend = %backend, status = %status, "Health check failed: non-200 status")
            }
            ProbeOutcome::Timeout => {
                tracing::warn!(service = %self.service, backend = %backend, timeout = ?self.config.timeout, "Health check failed: timeout")
            }
            ProbeOutcome::Refused => {
                tracing::warn!(service = %self.service, backend = %backend, "Health check failed: connection refused")
            }
            ProbeOutcome::Failed(e) => {
                tracing::error!(service = %self.service, backend = %backend, error = %e, "Health check failed: transport error")
            }
        }
        outcome
    }
}

/// Health check URL for `backend`: its target path joined with `path`, query kept.
fn health_url(backend: &Backend, path: &str) -> String {
    let mut url = backend.url().clone();
    let joined = format!(
        "{}/{}",
        url.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);
    url.to_string()
}

/// Map a client error onto a probe outcome by walking its source chain.
fn classify_error(err: &hyper_util::client::legacy::Error) -> ProbeOutcome {
    let mut source: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            match io.kind() {
                std::io::ErrorKind::ConnectionRefused => return ProbeOutcome::Refused,
                std::io::ErrorKind::TimedOut => return ProbeOutcome::Timeout,
                _ => {}
            }
        }
        source = cause.source();
    }
    ProbeOutcome::Failed(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::build_client;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicU16, Ordering};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Minimal backend answering every request with the status in `status`.
    async fn status_backend(status: Arc<AtomicU16>) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let status = status.load(Ordering::SeqCst);
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    let _ = socket.read(&mut buf).await;
                    let response = format!(
                        "HTTP/1.1 {} X\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                        status
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        addr
    }

    /// Backend that accepts connections and never answers.
    async fn silent_backend() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        addr
    }

    /// An address nothing listens on.
    fn closed_addr() -> SocketAddr {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    }

    fn checker(pool: Arc<BackendPool>, timeout: Duration) -> HealthChecker {
        HealthChecker::new(
            "test",
            pool,
            HealthCheckSpec {
                path: "/health".into(),
                interval: Duration::from_secs(1),
                timeout,
            },
            build_client(None),
        )
    }

    #[test]
    fn health_url_joins_target_path_and_keeps_query() {
        let url = |target: &str| health_url(&Backend::new(0, target).unwrap(), "/health");
        assert_eq!(url("http://h:1"), "http://h:1/health");
        assert_eq!(url("http://h:1/api/"), "http://h:1/api/health");
        assert_eq!(url("http://h:1/?k=v"), "http://h:1/health?k=v");
    }

    #[tokio::test]
    async fn non_200_backend_is_excluded_then_readmitted() {
        let good = status_backend(Arc::new(AtomicU16::new(200))).await;
        let flaky_status = Arc::new(AtomicU16::new(500));
        let flaky = status_backend(flaky_status.clone()).await;

        let pool = Arc::new(
            BackendPool::new(&[format!("http://{}", good), format!("http://{}", flaky)]).unwrap(),
        );
        let checker = checker(pool.clone(), Duration::from_secs(2));

        let results = checker.tick().await;
        assert_eq!(results, HashMap::from([(0, true), (1, false)]));
        let active: Vec<usize> = pool.snapshot().iter().map(|b| b.id()).collect();
        assert_eq!(active, vec![0]);

        flaky_status.store(200, Ordering::SeqCst);
        checker.tick().await;
        let active: Vec<usize> = pool.snapshot().iter().map(|b| b.id()).collect();
        assert_eq!(active, vec![0, 1]);
    }

    #[tokio::test]
    async fn refused_and_silent_backends_are_unhealthy() {
        let silent = silent_backend().await;
        let closed = closed_addr();
        let pool = Arc::new(
            BackendPool::new(&[format!("http://{}", closed), format!("http://{}", silent)]).unwrap(),
        );
        let checker = checker(pool.clone(), Duration::from_millis(300));

        let started = std::time::Instant::now();
        assert_eq!(checker.probe(&pool.backends()[0]).await, ProbeOutcome::Refused);
        assert_eq!(checker.probe(&pool.backends()[1]).await, ProbeOutcome::Timeout);

        checker.tick().await;
        assert!(pool.snapshot().is_empty());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let pool = Arc::new(BackendPool::new(&[format!("http://{}", closed_addr())]).unwrap());
        let checker = checker(pool, Duration::from_millis(100));
        let (tx, rx) = broadcast::channel(1);

        let handle = tokio::spawn(checker.run(rx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("checker did not stop")
            .unwrap();
    }
}
