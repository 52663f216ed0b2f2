//! Metrics collection and exposition.
//!
//! # Metrics
//! - `reloader_reconcile_total` (counter): passes by outcome
//! - `reloader_reconcile_duration_seconds` (histogram): pass latency
//! - `reloader_document_writes_total` (counter): documents replaced
//! - `reloader_proxy_reloads_total` (counter): reload commands by result
//! - `reloader_host_changes_total` (counter): resolver address changes
//! - `reloader_restarts_scheduled_total` (counter): scheduler decisions by kind

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_reconcile(outcome: &'static str, started: Instant) {
    counter!("reloader_reconcile_total", "outcome" => outcome).increment(1);
    histogram!("reloader_reconcile_duration_seconds").record(started.elapsed().as_secs_f64());
}

pub fn record_document_write() {
    counter!("reloader_document_writes_total").increment(1);
}

pub fn record_proxy_reload(success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!("reloader_proxy_reloads_total", "result" => result).increment(1);
}

pub fn record_host_change() {
    counter!("reloader_host_changes_total").increment(1);
}

pub fn record_restart_scheduled(kind: &'static str) {
    counter!("reloader_restarts_scheduled_total", "kind" => kind).increment(1);
}
