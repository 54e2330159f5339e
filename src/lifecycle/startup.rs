//! Startup orchestration.
//!
//! # Responsibilities
//! - Launch every configured service as its own task
//! - Keep the remaining services running when one fails to build, bind or serve
//! - Report how each service ended
//!
//! Services start concurrently; there is no ordering between them.

use tokio::sync::broadcast;
use tokio::task::JoinSet;

use crate::config::ServiceSpec;
use crate::http::{HttpServer, ServiceError};
use crate::lifecycle::Shutdown;
use crate::net::listener;

/// How the services of one gateway ended.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GatewayReport {
    pub stopped: usize,
    pub failed: usize,
}

impl GatewayReport {
    pub fn all_failed(&self) -> bool {
        self.failed > 0 && self.stopped == 0
    }
}

/// Supervisor over one task per service.
pub struct Gateway {
    tasks: JoinSet<(String, Result<(), ServiceError>)>,
}

impl Gateway {
    /// Start every service. Must be called before `shutdown` is triggered.
    pub fn launch(services: Vec<ServiceSpec>, shutdown: &Shutdown) -> Self {
        let mut tasks = JoinSet::new();
        for spec in services {
            let rx = shutdown.subscribe();
            let source = spec.source.clone();
            tasks.spawn(async move {
                let result = run_service(spec, rx).await;
                (source, result)
            });
        }
        Self { tasks }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every service to end.
    pub async fn wait(mut self) -> GatewayReport {
        let mut report = GatewayReport::default();
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok((source, Ok(()))) => {
                    tracing::info!(service = %source, "Service exited");
                    report.stopped += 1;
                }
                Ok((source, Err(e))) => {
                    tracing::error!(service = %source, error = %e, "Service failed");
                    report.failed += 1;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Service task aborted");
                    report.failed += 1;
                }
            }
        }
        report
    }
}

/// Build, bind and serve one service until shutdown.
pub async fn run_service(
    spec: ServiceSpec,
    shutdown: broadcast::Receiver<()>,
) -> Result<(), ServiceError> {
    let server = HttpServer::new(spec)?;
    let listener = listener::bind(server.source())?;
    server.run(listener, shutdown).await
}
