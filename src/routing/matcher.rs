//! Route matching logic.
//!
//! # Responsibilities
//! - Match host (exact match, case-insensitive, port ignored)
//! - Match path prefix on segment boundaries (case-sensitive)
//! - Match header and query conditions (presence or exact value)
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Host matching is case-insensitive (DNS names are case-insensitive)
//! - Path matching is case-sensitive
//! - Empty condition = always matches (wildcard)
//! - No regex to guarantee O(n) matching

use crate::routing::attributes::RequestAttributes;
use crate::routing::spec::{KeyMatcher, RoutePredicate};

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &RequestAttributes) -> bool;
}

/// Matches the request host.
#[derive(Debug, Clone)]
pub struct HostMatcher {
    expected_host: String,
}

impl HostMatcher {
    /// Create a new host matcher.
    /// The host is normalized to lowercase for case-insensitive matching.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            expected_host: host.into().to_lowercase(),
        }
    }
}

impl Matcher for HostMatcher {
    fn matches(&self, req: &RequestAttributes) -> bool {
        req.host_name()
            .map(|h| h == self.expected_host)
            .unwrap_or(false)
    }
}

/// Matches the request path prefix.
///
/// `/api` matches `/api` and `/api/users`, never `/api-internal`.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, req: &RequestAttributes) -> bool {
        let Some(rest) = req.path.strip_prefix(self.prefix.as_str()) else {
            return false;
        };
        rest.is_empty() || rest.starts_with('/') || self.prefix.ends_with('/')
    }
}

/// Matches a request header by presence or exact value.
#[derive(Debug, Clone)]
pub struct HeaderMatcher {
    name: String,
    value: Option<String>,
}

impl HeaderMatcher {
    pub fn new(name: impl Into<String>, value: Option<String>) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            value,
        }
    }
}

impl Matcher for HeaderMatcher {
    fn matches(&self, req: &RequestAttributes) -> bool {
        req.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(&self.name))
            .any(|(_, v)| self.value.as_deref().map_or(true, |expected| v == expected))
    }
}

/// Matches a query parameter by presence or exact value.
#[derive(Debug, Clone)]
pub struct QueryMatcher {
    name: String,
    value: Option<String>,
}

impl QueryMatcher {
    pub fn new(name: impl Into<String>, value: Option<String>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl Matcher for QueryMatcher {
    fn matches(&self, req: &RequestAttributes) -> bool {
        req.query_values(&self.name)
            .any(|v| self.value.as_deref().map_or(true, |expected| v == expected))
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }

    /// Compile a route predicate.
    ///
    /// The path check goes first since it rejects most candidates.
    pub fn from_predicate(predicate: &RoutePredicate) -> Self {
        let mut matchers: Vec<Box<dyn Matcher>> =
            vec![Box::new(PathPrefixMatcher::new(predicate.path_prefix.clone()))];

        if let Some(host) = &predicate.host {
            matchers.push(Box::new(HostMatcher::new(host.clone())));
        }
        for KeyMatcher { name, value } in &predicate.headers {
            matchers.push(Box::new(HeaderMatcher::new(name.clone(), value.clone())));
        }
        for KeyMatcher { name, value } in &predicate.query {
            matchers.push(Box::new(QueryMatcher::new(name.clone(), value.clone())));
        }

        Self::new(matchers)
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, req: &RequestAttributes) -> bool {
        // All matchers must pass (AND)
        self.matchers.iter().all(|m| m.matches(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_matcher() {
        let matcher = HostMatcher::new("example.com");

        let req1 = RequestAttributes::for_path("/").with_host("example.com");
        assert!(matcher.matches(&req1));

        let req2 = RequestAttributes::for_path("/").with_host("EXAMPLE.COM:443");
        assert!(matcher.matches(&req2)); // Case insensitive, port ignored

        let req3 = RequestAttributes::for_path("/").with_host("other.com");
        assert!(!matcher.matches(&req3));

        assert!(!matcher.matches(&RequestAttributes::for_path("/")));
    }

    #[test]
    fn test_path_matcher() {
        let matcher = PathPrefixMatcher::new("/api");

        assert!(matcher.matches(&RequestAttributes::for_path("/api/v1")));
        assert!(!matcher.matches(&RequestAttributes::for_path("/images")));
        assert!(!matcher.matches(&RequestAttributes::for_path("/API/v1")));
    }

    #[test]
    fn test_path_matcher_respects_segment_boundary() {
        let matcher = PathPrefixMatcher::new("/api");
        assert!(matcher.matches(&RequestAttributes::for_path("/api")));
        assert!(matcher.matches(&RequestAttributes::for_path("/api/")));
        assert!(!matcher.matches(&RequestAttributes::for_path("/api-internal/secrets")));
        assert!(!matcher.matches(&RequestAttributes::for_path("/apiv2")));

        let root = PathPrefixMatcher::new("/");
        assert!(root.matches(&RequestAttributes::for_path("/")));
        assert!(root.matches(&RequestAttributes::for_path("/anything/at/all")));

        let dir = PathPrefixMatcher::new("/static/");
        assert!(dir.matches(&RequestAttributes::for_path("/static/app.js")));
        assert!(!dir.matches(&RequestAttributes::for_path("/static")));
    }

    #[test]
    fn test_header_and_query_matchers() {
        let req = RequestAttributes::for_path("/")
            .with_header("X-Canary", "true")
            .with_query("debug", "1");

        assert!(HeaderMatcher::new("x-canary", None).matches(&req));
        assert!(HeaderMatcher::new("X-CANARY", Some("true".into())).matches(&req));
        assert!(!HeaderMatcher::new("x-canary", Some("false".into())).matches(&req));
        assert!(!HeaderMatcher::new("x-other", None).matches(&req));

        assert!(QueryMatcher::new("debug", None).matches(&req));
        assert!(QueryMatcher::new("debug", Some("1".into())).matches(&req));
        assert!(!QueryMatcher::new("Debug", None).matches(&req));
    }

    #[test]
    fn test_compiled_predicate() {
        let predicate = RoutePredicate {
            path_prefix: "/api".into(),
            host: Some("api.example.com".into()),
            headers: vec![KeyMatcher {
                name: "x-tenant".into(),
                value: Some("acme".into()),
            }],
            query: vec![],
        };
        let matcher = AndMatcher::from_predicate(&predicate);

        let ok = RequestAttributes::for_path("/api/users")
            .with_host("api.example.com")
            .with_header("X-Tenant", "acme");
        assert!(matcher.matches(&ok));

        let wrong_tenant = RequestAttributes::for_path("/api/users")
            .with_host("api.example.com")
            .with_header("X-Tenant", "globex");
        assert!(!matcher.matches(&wrong_tenant));

        let no_host = RequestAttributes::for_path("/api/users").with_header("X-Tenant", "acme");
        assert!(!matcher.matches(&no_host));
    }
}
