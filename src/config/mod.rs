//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! engine config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → EngineConfig (validated, immutable)
//!
//! Route documents:
//!     watcher.rs (file, notify) or remote.rs (HTTP poll)
//!     → Payload over mpsc channel
//!     → watcher::apply_updates
//!     → RouteTableManager::apply_from (parse, diff, atomic swap)
//! ```
//!
//! # Design Decisions
//! - Engine config is immutable once loaded; changes require restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Sources own transport retries; the route table never does I/O

pub mod loader;
pub mod remote;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::AdminConfig;
pub use schema::EngineConfig;
pub use schema::FileSourceConfig;
pub use schema::ObservabilityConfig;
pub use schema::RemoteSourceConfig;
pub use schema::RetryConfig;
pub use schema::SourceConfig;
