//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define proxy metrics (requests, latency, cache outcomes, fallbacks)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `proxy_requests_total` (counter): proxied requests by method, status, route
//! - `proxy_request_duration_seconds` (histogram): latency distribution
//! - `proxy_cache_lookups_total` (counter): store lookups by outcome (hit/miss)
//! - `proxy_cache_bypass_total` (counter): requests on exempt paths
//! - `proxy_fallback_total` (counter): requests handed to the fallback
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Labels for route, method, status code

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

/// Record a completed proxied request.
pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    ::metrics::counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "route" => route.to_string()
    )
    .increment(1);
    ::metrics::histogram!("proxy_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record a cache store lookup (`hit` or `miss`).
pub fn record_cache_lookup(outcome: &'static str) {
    ::metrics::counter!("proxy_cache_lookups_total", "outcome" => outcome).increment(1);
}

pub fn record_cache_bypass() {
    ::metrics::counter!("proxy_cache_bypass_total").increment(1);
}

pub fn record_fallback() {
    ::metrics::counter!("proxy_fallback_total").increment(1);
}
