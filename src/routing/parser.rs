//! Route payload decoding and validation.
//!
//! # Responsibilities
//! - Decode a raw payload (JSON array or TOML `[[routes]]` tables)
//! - Validate every record and normalize it into a [`RouteSpec`]
//! - Reject the whole payload on the first invalid record
//!
//! # Design Decisions
//! - Pure function: bytes in, routes or error out
//! - Records are decoded one at a time so errors carry the record index
//! - Unknown fields are ignored so newer producers do not break older engines

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::routing::attributes;
use crate::routing::error::RouteError;
use crate::routing::spec::{FilterDirective, KeyMatcher, RoutePredicate, RouteSpec, Target};

/// Encoding of a route payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    /// A JSON array of route objects.
    #[default]
    Json,
    /// A TOML document with a `[[routes]]` array of tables.
    Toml,
}

impl PayloadFormat {
    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "json" => Some(PayloadFormat::Json),
            "toml" => Some(PayloadFormat::Toml),
            _ => None,
        }
    }
}

impl FromStr for PayloadFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(PayloadFormat::Json),
            "toml" => Ok(PayloadFormat::Toml),
            other => Err(format!("unknown payload format `{other}`")),
        }
    }
}

impl std::fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadFormat::Json => f.write_str("json"),
            PayloadFormat::Toml => f.write_str("toml"),
        }
    }
}

const URI_SCHEMES: &[&str] = &["http", "https", "ws", "wss", "lb"];

/// A route record as it appears on the wire.
#[derive(Debug, Deserialize)]
struct RawRoute {
    id: Option<String>,
    path: Option<String>,
    host: Option<String>,
    #[serde(default)]
    headers: Vec<RawKeyMatcher>,
    #[serde(default)]
    query: Vec<RawKeyMatcher>,
    #[serde(default)]
    filters: Vec<RawFilter>,
    #[serde(alias = "uri")]
    target: Option<String>,
    priority: Option<i64>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RawKeyMatcher {
    name: String,
    value: Option<String>,
}

/// Filters are either `{name, args}` objects or the `Name=arg1,arg2` shorthand.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawFilter {
    Shorthand(String),
    Full {
        name: String,
        #[serde(default)]
        args: BTreeMap<String, String>,
    },
}

#[derive(Debug, Deserialize)]
struct TomlDocument {
    #[serde(default)]
    routes: Vec<toml::Value>,
}

/// Decode and validate a route payload.
///
/// Returns routes in declaration order. Priority defaults to 0.
pub fn parse_routes(raw: &[u8], format: PayloadFormat) -> Result<Vec<RouteSpec>, RouteError> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| RouteError::malformed(format!("payload is not valid UTF-8: {e}")))?;
    if text.trim().is_empty() {
        return Err(RouteError::malformed("payload is blank"));
    }

    let records = decode_records(text, format)?;

    let mut routes = Vec::with_capacity(records.len());
    let mut seen: HashMap<String, usize> = HashMap::with_capacity(records.len());

    for (index, record) in records.into_iter().enumerate() {
        let route = validate_record(index, record)?;
        if let Some(&first_index) = seen.get(&route.id) {
            return Err(RouteError::DuplicateRoute {
                id: route.id,
                index,
                first_index,
            });
        }
        seen.insert(route.id.clone(), index);
        routes.push(route);
    }

    Ok(routes)
}

fn decode_records(text: &str, format: PayloadFormat) -> Result<Vec<RawRoute>, RouteError> {
    match format {
        PayloadFormat::Json => {
            let values: Vec<serde_json::Value> = serde_json::from_str(text).map_err(|e| {
                RouteError::malformed(format!("expected a JSON array of route objects: {e}"))
            })?;
            values
                .into_iter()
                .enumerate()
                .map(|(index, value)| {
                    serde_json::from_value(value)
                        .map_err(|e| record_error(index, e.to_string()))
                })
                .collect()
        }
        PayloadFormat::Toml => {
            let doc: TomlDocument = toml::from_str(text)
                .map_err(|e| RouteError::malformed(format!("invalid TOML route document: {e}")))?;
            doc.routes
                .into_iter()
                .enumerate()
                .map(|(index, value)| {
                    value
                        .try_into()
                        .map_err(|e: toml::de::Error| record_error(index, e.to_string()))
                })
                .collect()
        }
    }
}

fn record_error(index: usize, message: String) -> RouteError {
    RouteError::Malformed {
        index: Some(index),
        field: None,
        message,
    }
}

fn validate_record(index: usize, raw: RawRoute) -> Result<RouteSpec, RouteError> {
    let id = raw.id.map(|s| s.trim().to_string()).unwrap_or_default();
    if id.is_empty() {
        return Err(RouteError::field(index, "id", "route id must not be empty"));
    }

    let path_prefix = normalize_path(index, raw.path)?;
    let host = normalize_host(index, raw.host)?;
    let headers = validate_matchers(index, "headers", raw.headers)?;
    let query = validate_matchers(index, "query", raw.query)?;
    let filters = validate_filters(index, raw.filters)?;
    let target = parse_target(index, raw.target)?;

    Ok(RouteSpec {
        id,
        predicate: RoutePredicate {
            path_prefix,
            host,
            headers,
            query,
        },
        filters,
        target,
        priority: raw.priority.unwrap_or(0),
        metadata: raw.metadata,
    })
}

fn normalize_path(index: usize, path: Option<String>) -> Result<String, RouteError> {
    let path = path.map(|p| p.trim().to_string()).unwrap_or_default();
    if path.is_empty() {
        return Err(RouteError::field(index, "path", "path must not be empty"));
    }
    if !path.starts_with('/') {
        return Err(RouteError::field(index, "path", "path must start with `/`"));
    }

    // `/api/**` is the pattern spelling of the `/api` prefix.
    let prefix = path.strip_suffix("/**").unwrap_or(&path);
    if prefix.contains('*') {
        return Err(RouteError::field(
            index,
            "path",
            "only a trailing `/**` wildcard is supported",
        ));
    }
    if prefix.is_empty() {
        return Ok("/".to_string());
    }
    Ok(prefix.to_string())
}

fn normalize_host(index: usize, host: Option<String>) -> Result<Option<String>, RouteError> {
    let Some(host) = host else {
        return Ok(None);
    };
    let host = host.trim();
    if host.is_empty() || host.contains(|c: char| c == '/' || c.is_whitespace()) {
        return Err(RouteError::field(index, "host", format!("invalid host `{host}`")));
    }
    // Request hosts are compared without their port, so route hosts are too.
    Ok(Some(attributes::normalize_host(host)))
}

fn validate_matchers(
    index: usize,
    field: &'static str,
    raw: Vec<RawKeyMatcher>,
) -> Result<Vec<KeyMatcher>, RouteError> {
    raw.into_iter()
        .map(|m| {
            let name = m.name.trim().to_string();
            if name.is_empty() {
                return Err(RouteError::field(index, field, "matcher name must not be empty"));
            }
            Ok(KeyMatcher {
                name,
                value: m.value,
            })
        })
        .collect()
}

fn validate_filters(
    index: usize,
    raw: Vec<RawFilter>,
) -> Result<Vec<FilterDirective>, RouteError> {
    raw.into_iter()
        .map(|filter| {
            let directive = match filter {
                RawFilter::Full { name, args } => FilterDirective {
                    name: name.trim().to_string(),
                    args,
                },
                RawFilter::Shorthand(text) => {
                    let (name, args) = text.split_once('=').unwrap_or((text.as_str(), ""));
                    let args = args
                        .split(',')
                        .map(str::trim)
                        .filter(|a| !a.is_empty())
                        .enumerate()
                        .map(|(i, a)| (i.to_string(), a.to_string()))
                        .collect();
                    FilterDirective {
                        name: name.trim().to_string(),
                        args,
                    }
                }
            };
            if directive.name.is_empty() {
                return Err(RouteError::field(index, "filters", "filter name must not be empty"));
            }
            Ok(directive)
        })
        .collect()
}

fn parse_target(index: usize, raw: Option<String>) -> Result<Target, RouteError> {
    let target = raw.map(|t| t.trim().to_string()).unwrap_or_default();
    let invalid = |reason: String| RouteError::InvalidTarget {
        index,
        target: target.clone(),
        reason,
    };

    if target.is_empty() {
        return Err(invalid("target must not be empty".to_string()));
    }

    if target.contains("://") {
        let url = Url::parse(&target).map_err(|e| invalid(e.to_string()))?;
        if !URI_SCHEMES.contains(&url.scheme()) {
            return Err(invalid(format!("unsupported scheme `{}`", url.scheme())));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(invalid("target URI has no host".to_string()));
        }
        return Ok(Target::Uri(target));
    }

    let valid_name = target
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'));
    if !valid_name {
        return Err(invalid("not a valid upstream name".to_string()));
    }
    Ok(Target::Upstream(target))
}
