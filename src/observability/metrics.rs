//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ssr_requests_total` (counter): dispatches by mode and outcome
//!   (`rendered`, `transform`, `module_resolution`, `render`)
//! - `ssr_render_duration_seconds` (histogram): dispatch latency by mode
//! - `ssr_pass_through_total` (counter): requests left to other handlers
//! - `ssr_entry_loads_total` (counter): render entry loads by mode; stays
//!   at 1 in Prod
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::mode::ServerMode;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_render(mode: ServerMode, outcome: &'static str, start: Instant) {
    metrics::counter!("ssr_requests_total", "mode" => mode.as_str(), "outcome" => outcome).increment(1);
    metrics::histogram!("ssr_render_duration_seconds", "mode" => mode.as_str())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_pass_through() {
    metrics::counter!("ssr_pass_through_total").increment(1);
}

pub fn record_entry_load(mode: ServerMode) {
    metrics::counter!("ssr_entry_loads_total", "mode" => mode.as_str()).increment(1);
}
