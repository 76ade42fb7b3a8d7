//! Metrics collection and exposition.
//!
//! # Metrics
//! - `route_table_applies_total` (counter): update attempts by result and error kind
//! - `route_table_version` (gauge): version of the snapshot being served
//! - `route_table_routes` (gauge): routes in the snapshot being served
//! - `route_table_delta_total` (counter): routes added/removed/updated
//! - `route_source_fetch_failures_total` (counter): transport failures by source
//!
//! # Design Decisions
//! - The `metrics` facade is a no-op until a recorder is installed, so
//!   library code records unconditionally
//! - Table gauges are driven by a route table subscriber, not the manager

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::routing::{RouteError, RouteTableManager, RoutesChanged, SubscriptionId};

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record the outcome of one route update.
pub fn record_apply(result: &Result<u64, RouteError>) {
    match result {
        Ok(_) => {
            metrics::counter!("route_table_applies_total", "result" => "ok").increment(1);
        }
        Err(e) => {
            metrics::counter!(
                "route_table_applies_total",
                "result" => "rejected",
                "kind" => e.kind().as_str()
            )
            .increment(1);
        }
    }
}

/// Record a failed fetch from a route source.
pub fn record_fetch_failure(source: &'static str) {
    metrics::counter!("route_source_fetch_failures_total", "source" => source).increment(1);
}

fn record_change(event: &RoutesChanged) {
    metrics::gauge!("route_table_version").set(event.version as f64);
    metrics::gauge!("route_table_routes").set(event.route_count as f64);
    metrics::counter!("route_table_delta_total", "kind" => "added")
        .increment(event.delta.added.len() as u64);
    metrics::counter!("route_table_delta_total", "kind" => "removed")
        .increment(event.delta.removed.len() as u64);
    metrics::counter!("route_table_delta_total", "kind" => "updated")
        .increment(event.delta.updated.len() as u64);
}

/// Keep the table gauges in sync with published snapshots.
pub fn subscribe_table_metrics(table: &RouteTableManager) -> SubscriptionId {
    table.subscribe(record_change)
}
