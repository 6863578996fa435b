//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_requests_total` (counter): origin-request dispositions
//! - `edge_redirects_total` (counter): redirects by kind
//! - `edge_render_failures_total` (counter): page renders that fell back to the error page
//! - `edge_regeneration_total` (counter): regeneration outcomes
//! - `edge_invalidations_total` (counter): CDN invalidations issued
//! - `edge_handler_duration_seconds` (histogram): hook latency

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// `disposition`: static_page, fallback_page, public_file, data_request, not_found, render.
pub fn record_request(disposition: &'static str) {
    counter!("edge_requests_total", "disposition" => disposition).increment(1);
}

pub fn record_redirect(kind: &'static str) {
    counter!("edge_redirects_total", "kind" => kind).increment(1);
}

pub fn record_render_failure() {
    counter!("edge_render_failures_total").increment(1);
}

/// `outcome`: enqueued, throttled, error, completed, skipped, failed.
pub fn record_regeneration(outcome: &'static str) {
    counter!("edge_regeneration_total", "outcome" => outcome).increment(1);
}

pub fn record_invalidation() {
    counter!("edge_invalidations_total").increment(1);
}

pub fn record_handler_duration(hook: &'static str, elapsed: Duration) {
    histogram!("edge_handler_duration_seconds", "hook" => hook).record(elapsed.as_secs_f64());
}
