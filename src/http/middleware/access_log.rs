//! Access logging stage.
//!
//! One structured event per request, emitted after the response head is
//! produced. The response itself is passed through untouched.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};

use crate::observability::metrics;

pub async fn access_log_middleware(
    State(service): State<Arc<str>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let version = request.version();
    let headers = loggable_headers(request.headers());
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let response = next.run(request).await;
    let status = response.status().as_u16();

    tracing::info!(
        service = %service,
        request_id = %request_id,
        method = %method,
        path = %uri.path(),
        query = uri.query().unwrap_or(""),
        version = ?version,
        headers = ?headers,
        status,
        latency_ms = start.elapsed().as_millis() as u64,
        "request"
    );
    metrics::record_request(&service, method.as_str(), status, start);

    response
}

/// Request headers with credential values masked.
fn loggable_headers(headers: &HeaderMap) -> HeaderMap {
    let mut headers = headers.clone();
    for name in [header::AUTHORIZATION, header::PROXY_AUTHORIZATION] {
        if headers.contains_key(&name) {
            headers.insert(name, HeaderValue::from_static("[redacted]"));
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_are_masked() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic YWxpY2U6cw=="));
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));

        let logged = loggable_headers(&headers);
        assert_eq!(logged[header::AUTHORIZATION], "[redacted]");
        assert_eq!(logged[header::ACCEPT], "*/*");
    }
}
