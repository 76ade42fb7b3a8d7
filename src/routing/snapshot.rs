//! Immutable, versioned route table.
//!
//! # Responsibilities
//! - Hold one version of the route set in declaration order
//! - Keep compiled matchers ordered for lookup
//! - Derive the next snapshot from a delta
//!
//! # Design Decisions
//! - Never mutated after construction; shared via `Arc`
//! - Unchanged routes are carried over by `Arc` clone, not copied
//! - Lookup order is priority descending, then declaration order (stable sort),
//!   so the first matching entry wins

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

use crate::routing::attributes::RequestAttributes;
use crate::routing::diff::RouteDelta;
use crate::routing::matcher::{AndMatcher, Matcher};
use crate::routing::spec::RouteSpec;

#[derive(Debug)]
struct CompiledRoute {
    route: Arc<RouteSpec>,
    matcher: AndMatcher,
}

/// One published version of the route table.
#[derive(Debug)]
pub struct RouteTableSnapshot {
    version: u64,
    /// Declaration order.
    routes: Vec<Arc<RouteSpec>>,
    /// Lookup order.
    compiled: Vec<CompiledRoute>,
}

impl RouteTableSnapshot {
    /// Build a snapshot from routes in declaration order.
    pub fn new(version: u64, routes: Vec<Arc<RouteSpec>>) -> Self {
        let mut compiled: Vec<CompiledRoute> = routes
            .iter()
            .map(|route| CompiledRoute {
                matcher: AndMatcher::from_predicate(&route.predicate),
                route: Arc::clone(route),
            })
            .collect();
        compiled.sort_by_key(|c| Reverse(c.route.priority));

        Self {
            version,
            routes,
            compiled,
        }
    }

    /// Build the successor of `previous` by applying `delta`.
    ///
    /// `order` is the declaration order of the new route set; every id in it
    /// is either carried over from `previous` or present in the delta.
    pub fn next<'a>(
        previous: Option<&RouteTableSnapshot>,
        delta: &RouteDelta,
        order: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let mut pool: HashMap<&str, &Arc<RouteSpec>> = previous
            .map(|p| p.routes.iter().map(|r| (r.id.as_str(), r)).collect())
            .unwrap_or_default();

        for id in &delta.removed {
            pool.remove(id.as_str());
        }
        for route in delta.updated.iter().chain(delta.added.iter()) {
            pool.insert(route.id.as_str(), route);
        }

        let routes = order
            .into_iter()
            .filter_map(|id| pool.get(id).map(|r| Arc::clone(r)))
            .collect();

        let version = previous.map_or(1, |p| p.version + 1);
        Self::new(version, routes)
    }

    /// Find the route for a request.
    pub fn lookup(&self, req: &RequestAttributes) -> Option<&Arc<RouteSpec>> {
        self.compiled
            .iter()
            .find(|c| c.matcher.matches(req))
            .map(|c| &c.route)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Routes in declaration order.
    pub fn routes(&self) -> &[Arc<RouteSpec>] {
        &self.routes
    }

    pub fn get(&self, id: &str) -> Option<&Arc<RouteSpec>> {
        self.routes.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::diff::diff;
    use crate::routing::parser::{parse_routes, PayloadFormat};

    fn routes(json: &str) -> Vec<RouteSpec> {
        parse_routes(json.as_bytes(), PayloadFormat::Json).unwrap()
    }

    fn snapshot(json: &str) -> RouteTableSnapshot {
        RouteTableSnapshot::new(1, routes(json).into_iter().map(Arc::new).collect())
    }

    #[test]
    fn test_highest_priority_wins() {
        let table = snapshot(
            r#"[{"id":"a","path":"/x","target":"svc1","priority":1},
                {"id":"b","path":"/x","target":"svc2","priority":5}]"#,
        );
        let hit = table.lookup(&RequestAttributes::for_path("/x")).unwrap();
        assert_eq!(hit.id, "b");
    }

    #[test]
    fn test_equal_priority_first_declared_wins() {
        let table = snapshot(
            r#"[{"id":"first","path":"/api","target":"svc1"},
                {"id":"second","path":"/api/users","target":"svc2"}]"#,
        );
        for _ in 0..10 {
            let hit = table.lookup(&RequestAttributes::for_path("/api/users/7")).unwrap();
            assert_eq!(hit.id, "first");
        }
    }

    #[test]
    fn test_predicates_filter_candidates() {
        let table = snapshot(
            r#"[{"id":"canary","path":"/","target":"svc-canary","priority":10,
                 "headers":[{"name":"x-canary","value":"true"}]},
                {"id":"tenant","path":"/","host":"acme.example.com","target":"svc-acme","priority":5},
                {"id":"default","path":"/","target":"svc"}]"#,
        );

        let canary = RequestAttributes::for_path("/home").with_header("X-Canary", "true");
        assert_eq!(table.lookup(&canary).unwrap().id, "canary");

        let tenant = RequestAttributes::for_path("/home").with_host("acme.example.com");
        assert_eq!(table.lookup(&tenant).unwrap().id, "tenant");

        let plain = RequestAttributes::for_path("/home");
        assert_eq!(table.lookup(&plain).unwrap().id, "default");
    }

    #[test]
    fn test_pattern_path_stops_at_segment_boundary() {
        let table = snapshot(
            r#"[{"id":"api","path":"/api/**","target":"svc-api","priority":10},
                {"id":"default","path":"/","target":"svc"}]"#,
        );
        let id = |path: &str| table.lookup(&RequestAttributes::for_path(path)).unwrap().id.clone();

        assert_eq!(id("/api"), "api");
        assert_eq!(id("/api/orders/7"), "api");
        assert_eq!(id("/api-internal/secrets"), "default");
        assert_eq!(id("/apiv2"), "default");
    }

    #[test]
    fn test_route_host_with_port_matches_request_host() {
        let table = snapshot(
            r#"[{"id":"h","path":"/","host":"api.example.com:8080","target":"svc"}]"#,
        );
        let with_port = RequestAttributes::for_path("/").with_host("api.example.com:8080");
        assert_eq!(table.lookup(&with_port).unwrap().id, "h");
        let bare = RequestAttributes::for_path("/").with_host("API.example.com");
        assert_eq!(table.lookup(&bare).unwrap().id, "h");
    }

    #[test]
    fn test_no_match() {
        let table = snapshot(r#"[{"id":"a","path":"/api","target":"svc"}]"#);
        assert!(table.lookup(&RequestAttributes::for_path("/static")).is_none());
    }

    #[test]
    fn test_next_shares_unchanged_routes() {
        let first = snapshot(
            r#"[{"id":"a","path":"/a","target":"svc"},
                {"id":"b","path":"/b","target":"svc"}]"#,
        );
        let new = routes(
            r#"[{"id":"c","path":"/c","target":"svc"},
                {"id":"a","path":"/a","target":"svc"}]"#,
        );
        let delta = diff(first.routes(), &new);
        let second =
            RouteTableSnapshot::next(Some(&first), &delta, new.iter().map(|r| r.id.as_str()));

        assert_eq!(second.version(), 2);
        let ids: Vec<_> = second.routes().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
        assert!(Arc::ptr_eq(first.get("a").unwrap(), second.get("a").unwrap()));
        assert!(second.get("b").is_none());
    }

    #[test]
    fn test_first_snapshot_version() {
        let new = routes(r#"[{"id":"a","path":"/a","target":"svc"}]"#);
        let delta = diff(&[], &new);
        let table = RouteTableSnapshot::next(None, &delta, new.iter().map(|r| r.id.as_str()));
        assert_eq!(table.version(), 1);
        assert_eq!(table.len(), 1);
    }
}
