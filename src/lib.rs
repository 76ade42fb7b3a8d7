//! Dynamic route table engine library.
//!
//! Route documents arrive from a [`config`] source, are parsed, diffed and
//! atomically published by [`routing::RouteTableManager`], and are read per
//! request through [`routing::RouteTableManager::lookup`].

pub mod admin;
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;

pub use config::schema::EngineConfig;
pub use lifecycle::Shutdown;
pub use routing::{RequestAttributes, RouteError, RouteSpec, RouteTableManager};
