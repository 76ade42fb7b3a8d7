//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, delays ordered)
//! - Check addresses and URLs parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EngineConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{EngineConfig, SourceConfig, PLACEHOLDER_API_KEY};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} `{value}` is not a valid {expected}")]
    Invalid {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("{field} is still the shipped placeholder; set a real key")]
    Placeholder { field: &'static str },

    #[error("retry.base_delay_ms ({base}) exceeds retry.max_delay_ms ({max})")]
    DelayOrder { base: u64, max: u64 },
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &EngineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match &config.source {
        SourceConfig::File(file) => {
            if file.path.as_os_str().is_empty() {
                errors.push(ValidationError::Empty { field: "source.path" });
            }
            if file.poll_interval_secs == 0 {
                errors.push(ValidationError::Zero {
                    field: "source.poll_interval_secs",
                });
            }
        }
        SourceConfig::Remote(remote) => {
            if remote.data_id.trim().is_empty() {
                errors.push(ValidationError::Empty { field: "source.data_id" });
            }
            if remote.group.trim().is_empty() {
                errors.push(ValidationError::Empty { field: "source.group" });
            }
            match Url::parse(&remote.server_addr) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                _ => errors.push(ValidationError::Invalid {
                    field: "source.server_addr",
                    value: remote.server_addr.clone(),
                    expected: "http(s) URL",
                }),
            }
            if remote.timeout_ms == 0 {
                errors.push(ValidationError::Zero { field: "source.timeout_ms" });
            }
            if remote.poll_interval_secs == 0 {
                errors.push(ValidationError::Zero {
                    field: "source.poll_interval_secs",
                });
            }
        }
    }

    if config.retry.base_delay_ms == 0 {
        errors.push(ValidationError::Zero { field: "retry.base_delay_ms" });
    }
    if config.retry.base_delay_ms > config.retry.max_delay_ms {
        errors.push(ValidationError::DelayOrder {
            base: config.retry.base_delay_ms,
            max: config.retry.max_delay_ms,
        });
    }

    if config.observability.metrics_enabled {
        check_socket_addr(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.admin.enabled {
        check_socket_addr(&mut errors, "admin.bind_address", &config.admin.bind_address);
        let key = config.admin.api_key.trim();
        if key.is_empty() {
            errors.push(ValidationError::Empty { field: "admin.api_key" });
        } else if key == PLACEHOLDER_API_KEY {
            errors.push(ValidationError::Placeholder { field: "admin.api_key" });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_socket_addr(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::Invalid {
            field,
            value: value.to_string(),
            expected: "socket address",
        });
    }
}
