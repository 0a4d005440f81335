//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, backend
//! - `proxy_request_duration_seconds` (histogram): latency distribution
//! - `proxy_backends_registered` (gauge): current registry size

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record the outcome of one proxied request.
pub fn record_request(method: &str, status: u16, backend: &str, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    let backend = backend.to_string();

    metrics::counter!(
        "proxy_requests_total",
        "method" => method.clone(),
        "status" => status.clone(),
        "backend" => backend.clone()
    )
    .increment(1);
    metrics::histogram!(
        "proxy_request_duration_seconds",
        "method" => method,
        "status" => status,
        "backend" => backend
    )
    .record(start.elapsed().as_secs_f64());
}

/// Publish the registry size.
pub fn record_backend_count(count: usize) {
    metrics::gauge!("proxy_backends_registered").set(count as f64);
}
