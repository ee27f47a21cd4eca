//! Metrics collection and exposition.
//!
//! # Metrics
//! - `prerender_requests_total` (counter): requests by outcome
//!   (`declined`, `cached`, `rendered`, `pass_through`, `hook_error`)
//! - `prerender_upstream_fetches_total` (counter): fetch attempts by result
//! - `prerender_upstream_duration_seconds` (histogram): fetch latency
//!
//! Without an installed recorder every call is a no-op.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record how the middleware handled a request.
pub fn record_outcome(outcome: &'static str) {
    counter!("prerender_requests_total", "outcome" => outcome).increment(1);
}

/// Record one fetch attempt against the rendering service.
pub fn record_fetch(result: &'static str, start: Instant) {
    counter!("prerender_upstream_fetches_total", "result" => result).increment(1);
    histogram!("prerender_upstream_duration_seconds", "result" => result)
        .record(start.elapsed().as_secs_f64());
}
