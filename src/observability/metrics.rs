//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gate_decisions_total` (counter): decisions by route group and outcome
//! - `gate_excluded_total` (counter): requests that bypassed the gate
//! - `gate_rejected_paths_total` (counter): paths refused before classification
//! - `gate_config_reloads_total` (counter): reload attempts by outcome
//! - `gate_upstream_errors_total` (counter): failed forwards
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::policy::Decision;
use crate::routing::table::RouteGroup;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_decision(group: Option<RouteGroup>, decision: Decision) {
    ::metrics::counter!(
        "gate_decisions_total",
        "group" => group.map_or("default", |g| g.as_str()),
        "decision" => decision.as_str()
    )
    .increment(1);
}

pub fn record_excluded() {
    ::metrics::counter!("gate_excluded_total").increment(1);
}

pub fn record_rejected_path() {
    ::metrics::counter!("gate_rejected_paths_total").increment(1);
}

pub fn record_reload(success: bool) {
    let outcome = if success { "applied" } else { "rejected" };
    ::metrics::counter!("gate_config_reloads_total", "outcome" => outcome).increment(1);
}

pub fn record_upstream_error() {
    ::metrics::counter!("gate_upstream_errors_total").increment(1);
}
