//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Update (per payload):
//!     raw bytes
//!     → parser.rs (decode & validate into RouteSpec[])
//!     → diff.rs (delta against current snapshot)
//!     → snapshot.rs (build next immutable snapshot)
//!     → manager.rs (atomic swap, then notify subscribers)
//!
//! Incoming Request (host, path, headers, query)
//!     → attributes.rs (extract routing attributes)
//!     → manager.rs (load current snapshot)
//!     → matcher.rs (evaluate match conditions)
//!     → Return: matched RouteSpec or None
//! ```
//!
//! # Design Decisions
//! - Snapshots are immutable; updates publish a new one
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by priority, then declaration order)

pub mod attributes;
pub mod diff;
pub mod error;
pub mod manager;
pub mod matcher;
pub mod parser;
pub mod snapshot;
pub mod spec;

pub use attributes::RequestAttributes;
pub use diff::{DeltaSummary, RouteDelta};
pub use error::{ErrorKind, RouteError};
pub use manager::{ManagerState, RouteTableManager, RoutesChanged, SharedRouteTable, SubscriptionId};
pub use parser::{parse_routes, PayloadFormat};
pub use snapshot::RouteTableSnapshot;
pub use spec::{FilterDirective, KeyMatcher, RoutePredicate, RouteSpec, Target};
