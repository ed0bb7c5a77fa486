//! Metrics collection and exposition.
//!
//! # Metrics
//! - `conductor_assemblies_total` (counter): assemblies by `changed`
//! - `conductor_validation_failures_total` (counter): rejected configs
//! - `conductor_reloads_total` (counter): proxy reloads by `outcome`
//! - `conductor_pending_changesets` (gauge): change sets awaiting reload
//!
//! Without an installed recorder every call is a no-op, so library code and
//! tests record unconditionally.

use std::net::SocketAddr;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr` and describe all metrics.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter");
            return;
        }
    }

    describe_counter!("conductor_assemblies_total", "Config assemblies by whether content changed");
    describe_counter!(
        "conductor_validation_failures_total",
        "Assembled configs rejected by the proxy validator"
    );
    describe_counter!("conductor_reloads_total", "Proxy reloads by outcome");
    describe_gauge!("conductor_pending_changesets", "Change sets waiting for the next reload");
}

pub fn record_assembly(changed: bool) {
    counter!("conductor_assemblies_total", "changed" => changed.to_string()).increment(1);
}

pub fn record_validation_failure() {
    counter!("conductor_validation_failures_total").increment(1);
}

pub fn record_reload(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("conductor_reloads_total", "outcome" => outcome).increment(1);
}

pub fn record_pending(count: usize) {
    gauge!("conductor_pending_changesets").set(count as f64);
}
