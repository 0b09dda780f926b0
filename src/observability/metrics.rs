//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_http_requests_total` (counter): requests by method, route, status
//! - `gateway_http_request_duration_seconds` (histogram): latency by route
//! - `gateway_deployments_total` (counter): deploy outcomes by network
//! - `gateway_resubmissions_total` (counter): stuck transactions replaced
//! - `gateway_confirmation_timeouts_total` (counter)
//! - `gateway_rpc_errors_total` (counter): failed RPC calls by operation
//!
//! Without an installed recorder every call here is a no-op.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Start the Prometheus scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_http_request(method: &str, route: &str, status: u16, start: Instant) {
    counter!(
        "gateway_http_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_http_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_deployment(network: &str, outcome: &'static str) {
    counter!(
        "gateway_deployments_total",
        "network" => network.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_resubmission() {
    counter!("gateway_resubmissions_total").increment(1);
}

pub fn record_timeout() {
    counter!("gateway_confirmation_timeouts_total").increment(1);
}

pub fn record_rpc_error(operation: &'static str) {
    counter!("gateway_rpc_errors_total", "operation" => operation).increment(1);
}
