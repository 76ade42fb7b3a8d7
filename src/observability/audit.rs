//! Route change audit log.
//!
//! One structured `info` event per published snapshot, naming every
//! route id that changed, under the `route_audit` target so it can be
//! routed to a separate sink with an `EnvFilter` directive.

use crate::routing::{RouteTableManager, RoutesChanged, SubscriptionId};

fn audit(event: &RoutesChanged) {
    tracing::info!(
        target: "route_audit",
        version = event.version,
        source = %event.source,
        routes = event.route_count,
        added = ?event.delta.added,
        removed = ?event.delta.removed,
        updated = ?event.delta.updated,
        "Routes changed"
    );
}

/// Log every route table change.
pub fn subscribe_audit_log(table: &RouteTableManager) -> SubscriptionId {
    table.subscribe(audit)
}
