//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mount_listener_up` (gauge): 1 while a listener of `kind` is serving
//! - `mount_listener_events_total` (counter): listener exits by `kind`, `outcome`
//! - `mount_idle_resets_total` (counter): requests that pushed the idle deadline
//! - `mount_data_changes_total` (counter): forwarded mutations by `model`
//! - `mount_restored_records_total` (counter): restore results by `kind`, `outcome`
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder with an HTTP scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe_gauge!("mount_listener_up", "Listener serving state by kind");
            describe_counter!("mount_listener_events_total", "Listener exits by outcome");
            describe_counter!("mount_idle_resets_total", "Requests that reset the idle timer");
            describe_counter!("mount_data_changes_total", "Data-change notifications by model");
            describe_counter!("mount_restored_records_total", "Restored records by outcome");
            tracing::info!(address = %addr, "Metrics exporter listening");
        }
        Err(error) => tracing::error!(address = %addr, error = %error, "Failed to install metrics exporter"),
    }
}

pub fn record_listener_state(kind: &'static str, up: bool) {
    gauge!("mount_listener_up", "kind" => kind).set(if up { 1.0 } else { 0.0 });
}

pub fn record_listener_exit(kind: &'static str, outcome: &'static str) {
    counter!("mount_listener_events_total", "kind" => kind, "outcome" => outcome).increment(1);
}

pub fn record_idle_reset() {
    counter!("mount_idle_resets_total").increment(1);
}

pub fn record_data_change(model: &'static str) {
    counter!("mount_data_changes_total", "model" => model).increment(1);
}

pub fn record_restore(kind: &'static str, applied: usize, failed: usize) {
    counter!("mount_restored_records_total", "kind" => kind, "outcome" => "applied")
        .increment(applied as u64);
    counter!("mount_restored_records_total", "kind" => kind, "outcome" => "failed")
        .increment(failed as u64);
}
