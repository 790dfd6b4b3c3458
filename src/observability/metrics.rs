//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, endpoint time)
//! - Expose a Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by api and status
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//! - `gateway_endpoint_duration_seconds` (histogram): backend latency

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on the given address.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter started"),
        Err(error) => tracing::error!(error = %error, "Failed to start metrics exporter"),
    }
}

/// Record one handled request.
pub fn record_request(api_id: &str, status: u16, started_at: Instant) {
    let labels = [("api", api_id.to_string()), ("status", status.to_string())];
    metrics::counter!("gateway_requests_total", &labels).increment(1);
    metrics::histogram!("gateway_request_duration_seconds", &labels).record(started_at.elapsed().as_secs_f64());
}

/// Record one backend invocation.
pub fn record_endpoint_time(api_id: &str, invoked_at: Instant) {
    let labels = [("api", api_id.to_string())];
    metrics::histogram!("gateway_endpoint_duration_seconds", &labels).record(invoked_at.elapsed().as_secs_f64());
}
