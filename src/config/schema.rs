//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the engine.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::routing::PayloadFormat;

/// Root configuration for the route engine.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Where route payloads come from.
    pub source: SourceConfig,

    /// Backoff applied when the source cannot be reached.
    pub retry: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// Route payload source.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// A local file, reloaded when it changes.
    File(FileSourceConfig),
    /// A remote configuration service, polled over HTTP.
    Remote(RemoteSourceConfig),
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::File(FileSourceConfig::default())
    }
}

/// File source configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FileSourceConfig {
    /// Path of the route document.
    pub path: PathBuf,

    /// Payload format. Inferred from the file extension when unset.
    pub format: Option<PayloadFormat>,

    /// Poll interval for filesystems without change notifications, in seconds.
    pub poll_interval_secs: u64,
}

impl Default for FileSourceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("routes.json"),
            format: None,
            poll_interval_secs: 2,
        }
    }
}

impl FileSourceConfig {
    /// The configured format, else the one implied by the extension, else JSON.
    pub fn effective_format(&self) -> PayloadFormat {
        self.format
            .or_else(|| PayloadFormat::from_path(&self.path))
            .unwrap_or_default()
    }
}

/// Remote configuration service settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RemoteSourceConfig {
    /// Base URL of the configuration service (e.g., "http://127.0.0.1:8848").
    pub server_addr: String,

    /// Identifier of the route document.
    pub data_id: String,

    /// Configuration group.
    pub group: String,

    /// Namespace (tenant); empty for the default namespace.
    pub namespace: String,

    /// Payload format of the document.
    pub format: PayloadFormat,

    /// Request timeout in milliseconds.
    pub timeout_ms: u64,

    /// Interval between polls in seconds.
    pub poll_interval_secs: u64,
}

impl Default for RemoteSourceConfig {
    fn default() -> Self {
        Self {
            server_addr: "http://127.0.0.1:8848".to_string(),
            data_id: String::new(),
            group: "DEFAULT_GROUP".to_string(),
            namespace: String::new(),
            format: PayloadFormat::Json,
            timeout_ms: 5000,
            poll_interval_secs: 5,
        }
    }
}

/// Retry configuration for source fetches.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum consecutive failed attempts before giving up (0 = retry forever).
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

/// Shipped admin key. Rejected by validation when the admin API is enabled.
pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_API_KEY.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert!(matches!(config.source, SourceConfig::File(_)));
        assert_eq!(config.retry.base_delay_ms, 500);
        assert!(!config.admin.enabled);
    }

    #[test]
    fn test_remote_source_document() {
        let config: EngineConfig = toml::from_str(
            r#"
            [source]
            kind = "remote"
            server_addr = "http://nacos:8848"
            data_id = "gateway-routes"
            namespace = "prod"

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        let SourceConfig::Remote(remote) = config.source else {
            panic!("expected remote source");
        };
        assert_eq!(remote.data_id, "gateway-routes");
        assert_eq!(remote.group, "DEFAULT_GROUP");
        assert_eq!(remote.timeout_ms, 5000);
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }

    #[test]
    fn test_file_format_inference() {
        let mut file = FileSourceConfig {
            path: "routes.toml".into(),
            ..Default::default()
        };
        assert_eq!(file.effective_format(), PayloadFormat::Toml);

        file.format = Some(PayloadFormat::Json);
        assert_eq!(file.effective_format(), PayloadFormat::Json);

        file.path = "routes.conf".into();
        file.format = None;
        assert_eq!(file.effective_format(), PayloadFormat::Json);
    }
}
