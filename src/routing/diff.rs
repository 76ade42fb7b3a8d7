//! Identifier-keyed comparison of two route sets.
//!
//! # Design Decisions
//! - Pure and infallible: two route sets in, one delta out
//! - Output is deterministic: added/updated follow the new declaration order,
//!   removed follows the old one
//! - An updated route is a remove-old + add-new for ordering purposes; its
//!   position is taken from the new payload

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;

use crate::routing::spec::RouteSpec;

/// Difference between the current route set and a newly parsed one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteDelta {
    /// Routes present only in the new set.
    pub added: Vec<Arc<RouteSpec>>,
    /// Identifiers present only in the old set.
    pub removed: Vec<String>,
    /// Routes present in both sets with different content (new content).
    pub updated: Vec<Arc<RouteSpec>>,
    /// Whether the surviving routes changed declaration order.
    pub reordered: bool,
}

impl RouteDelta {
    /// True when applying the delta would not change any route's content.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }

    /// True when the delta changes neither content nor order.
    pub fn is_noop(&self) -> bool {
        self.is_empty() && !self.reordered
    }

    pub fn summary(&self) -> DeltaSummary {
        DeltaSummary {
            added: self.added.iter().map(|r| r.id.clone()).collect(),
            removed: self.removed.clone(),
            updated: self.updated.iter().map(|r| r.id.clone()).collect(),
        }
    }
}

/// Identifier-only view of a delta, handed to subscribers and logs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeltaSummary {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub updated: Vec<String>,
}

/// Compute the delta that turns `old` into `new`.
pub fn diff(old: &[Arc<RouteSpec>], new: &[RouteSpec]) -> RouteDelta {
    let old_by_id: HashMap<&str, &Arc<RouteSpec>> =
        old.iter().map(|r| (r.id.as_str(), r)).collect();
    let new_ids: HashSet<&str> = new.iter().map(|r| r.id.as_str()).collect();

    let mut delta = RouteDelta::default();

    for route in new {
        match old_by_id.get(route.id.as_str()) {
            None => delta.added.push(Arc::new(route.clone())),
            Some(existing) if ***existing != *route => {
                delta.updated.push(Arc::new(route.clone()))
            }
            Some(_) => {}
        }
    }

    delta.removed = old
        .iter()
        .filter(|r| !new_ids.contains(r.id.as_str()))
        .map(|r| r.id.clone())
        .collect();

    // Relative order of the routes both sets share.
    let survivors_old = old.iter().map(|r| r.id.as_str()).filter(|id| new_ids.contains(id));
    let survivors_new = new
        .iter()
        .map(|r| r.id.as_str())
        .filter(|id| old_by_id.contains_key(id));
    delta.reordered = !survivors_old.eq(survivors_new);

    delta
}
