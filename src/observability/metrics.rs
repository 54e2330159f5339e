//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by service, method, status
//! - `gateway_request_duration_seconds` (histogram): latency by service
//! - `gateway_upstream_requests_total` (counter): forwards by backend and outcome
//! - `gateway_backend_healthy` (gauge): 1=healthy, 0=unhealthy
//! - `gateway_health_probes_total` (counter): probes by backend and outcome
//!
//! Recording is a no-op until `init_metrics` installs the Prometheus recorder.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one completed downstream request.
pub fn record_request(service: &str, method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "service" => service.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "gateway_request_duration_seconds",
        "service" => service.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record the outcome of one forwarding attempt.
pub fn record_upstream(service: &str, backend: &str, outcome: &'static str) {
    metrics::counter!(
        "gateway_upstream_requests_total",
        "service" => service.to_string(),
        "backend" => backend.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record one health probe and the backend's resulting state.
pub fn record_probe(service: &str, backend: &str, outcome: &'static str, healthy: bool) {
    metrics::counter!(
        "gateway_health_probes_total",
        "service" => service.to_string(),
        "backend" => backend.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::gauge!(
        "gateway_backend_healthy",
        "service" => service.to_string(),
        "backend" => backend.to_string()
    )
    .set(if healthy { 1.0 } else { 0.0 });
}
