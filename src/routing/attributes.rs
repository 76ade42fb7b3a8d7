//! Routing-relevant view of an inbound request.

use axum::http::Request;
use serde::{Deserialize, Serialize};

/// The request attributes a route lookup needs.
///
/// Header names are stored lowercased; the host is stored lowercased
/// without its port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestAttributes {
    pub host: Option<String>,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
}

impl RequestAttributes {
    /// Attributes for a bare path, with no host, headers or query.
    pub fn for_path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_host(mut self, host: impl AsRef<str>) -> Self {
        self.host = Some(normalize_host(host.as_ref()));
        self
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .push((name.as_ref().to_ascii_lowercase(), value.into()));
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Normalize attributes built by hand or deserialized: lowercase header
    /// names and a lowercase host without port.
    pub fn normalized(mut self) -> Self {
        self.host = self.host.as_deref().map(normalize_host);
        for (name, _) in &mut self.headers {
            name.make_ascii_lowercase();
        }
        self
    }

    /// Extract attributes from an HTTP request.
    ///
    /// The host comes from the `Host` header, falling back to the URI authority.
    pub fn from_request<B>(req: &Request<B>) -> Self {
        let host = req
            .headers()
            .get("host")
            .and_then(|h| h.to_str().ok())
            .or_else(|| req.uri().host())
            .map(normalize_host);

        let headers = req
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let query = req
            .uri()
            .query()
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();

        Self {
            host,
            path: req.uri().path().to_string(),
            headers,
            query,
        }
    }

    /// First value of a header, by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values of a query parameter.
    pub fn query_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.query
            .iter()
            .filter(move |(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Host without port, if any.
    pub(crate) fn host_name(&self) -> Option<&str> {
        self.host.as_deref()
    }
}

/// Lowercase a host and drop a numeric port.
///
/// A port is only recognised on `name:port` or `[v6]:port`; an unbracketed
/// IPv6 literal such as `::1` is kept whole.
pub(crate) fn normalize_host(host: &str) -> String {
    let host = host.trim().to_ascii_lowercase();
    let stripped = split_port(&host)
        .filter(|(_, port)| !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()))
        .map(|(name, _)| name.to_string());
    stripped.unwrap_or(host)
}

fn split_port(host: &str) -> Option<(&str, &str)> {
    if host.starts_with('[') {
        let idx = host.rfind("]:")?;
        Some((&host[..=idx], &host[idx + 2..]))
    } else if host.matches(':').count() == 1 {
        host.split_once(':')
    } else {
        None
    }
}
