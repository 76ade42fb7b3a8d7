//! Route definitions.
//!
//! A [`RouteSpec`] is the validated, immutable form of one route record.
//! Parsing and validation live in `parser.rs`; these types only describe
//! what a route is.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A validated route definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSpec {
    /// Unique route identifier.
    pub id: String,

    /// Request predicates that must all hold for this route to match.
    #[serde(rename = "match")]
    pub predicate: RoutePredicate,

    /// Ordered filter/transform directives for the proxying layer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterDirective>,

    /// Upstream the request is forwarded to.
    pub target: Target,

    /// Route priority (higher wins on overlap).
    pub priority: i64,

    /// Free-form annotations carried through untouched.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// Match conditions of a route, combined with AND semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePredicate {
    /// Path prefix (always starts with `/`).
    pub path_prefix: String,

    /// Host to match, lowercased, without port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<KeyMatcher>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query: Vec<KeyMatcher>,
}

/// A named header or query condition.
///
/// Without a value only presence is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMatcher {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// A filter directive such as `StripPrefix` or `AddRequestHeader`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDirective {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub args: BTreeMap<String, String>,
}

/// Where a matched request goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Target {
    /// A named upstream resolved by the proxying layer (e.g. `svc1`).
    Upstream(String),
    /// An absolute URI (`http`, `https`, `ws`, `wss` or `lb`).
    Uri(String),
}

impl Target {
    /// The textual form of the target as it appeared in the payload.
    pub fn as_str(&self) -> &str {
        match self {
            Target::Upstream(name) => name,
            Target::Uri(uri) => uri,
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
