//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Route source fetch:
//!     → On failure: backoff.rs (exponential delay with jitter)
//!     → Retry until success, shutdown, or retry.max_attempts
//! ```
//!
//! # Design Decisions
//! - Only sources retry; a rejected payload is never retried automatically
//! - Jitter avoids synchronized polling against the config service

pub mod backoff;
