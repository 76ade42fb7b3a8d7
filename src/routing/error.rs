//! Route table error definitions.

use serde::Serialize;
use thiserror::Error;

/// Coarse classification of route update failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Payload could not be decoded or a record failed a structural check.
    MalformedInput,
    /// Two records share an identifier.
    DuplicateRoute,
    /// A record's target is not a usable upstream reference.
    InvalidTarget,
    /// The route source could not be reached. Never produced by the manager.
    TransportFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MalformedInput => "malformed_input",
            ErrorKind::DuplicateRoute => "duplicate_route",
            ErrorKind::InvalidTarget => "invalid_target",
            ErrorKind::TransportFailure => "transport_failure",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that reject a route payload.
///
/// Any of these leaves the current route table untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The payload is not a decodable route document, or a record is structurally invalid.
    #[error("malformed route payload{}: {message}", location(.index, .field))]
    Malformed {
        index: Option<usize>,
        field: Option<&'static str>,
        message: String,
    },

    /// An identifier appears more than once.
    #[error("duplicate route id `{id}` at index {index} (first declared at index {first_index})")]
    DuplicateRoute {
        id: String,
        index: usize,
        first_index: usize,
    },

    /// The target is empty or not a valid upstream reference.
    #[error("invalid target `{target}` at index {index}: {reason}")]
    InvalidTarget {
        index: usize,
        target: String,
        reason: String,
    },
}

impl RouteError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        RouteError::Malformed {
            index: None,
            field: None,
            message: message.into(),
        }
    }

    pub(crate) fn field(index: usize, field: &'static str, message: impl Into<String>) -> Self {
        RouteError::Malformed {
            index: Some(index),
            field: Some(field),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RouteError::Malformed { .. } => ErrorKind::MalformedInput,
            RouteError::DuplicateRoute { .. } => ErrorKind::DuplicateRoute,
            RouteError::InvalidTarget { .. } => ErrorKind::InvalidTarget,
        }
    }

    /// Index of the offending record, when one can be named.
    pub fn index(&self) -> Option<usize> {
        match self {
            RouteError::Malformed { index, .. } => *index,
            RouteError::DuplicateRoute { index, .. } => Some(*index),
            RouteError::InvalidTarget { index, .. } => Some(*index),
        }
    }

    /// Name of the offending field, when one can be named.
    pub fn field_name(&self) -> Option<&'static str> {
        match self {
            RouteError::Malformed { field, .. } => *field,
            RouteError::DuplicateRoute { .. } => Some("id"),
            RouteError::InvalidTarget { .. } => Some("target"),
        }
    }
}

fn location(index: &Option<usize>, field: &Option<&'static str>) -> String {
    match (index, field) {
        (Some(i), Some(f)) => format!(" at index {i}, field `{f}`"),
        (Some(i), None) => format!(" at index {i}"),
        _ => String::new(),
    }
}
