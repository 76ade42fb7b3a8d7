//! Remote configuration service poller.
//!
//! # Responsibilities
//! - Fetch the route document from the configuration service over HTTP
//! - Forward only changed documents to the update loop
//! - Retry failed fetches with exponential backoff and jitter
//!
//! # Design Decisions
//! - Transport failures stay here; the route table only sees payloads
//! - An unchanged document is not resent, so a rejected payload is logged once
//! - Query layout follows the Nacos open API (`dataId`, `group`, `tenant`)

use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use url::Url;

use crate::config::schema::{RemoteSourceConfig, RetryConfig};
use crate::config::watcher::{Payload, WatchError};
use crate::observability::metrics;
use crate::resilience::backoff::backoff_for;

const CONFIG_PATH: &str = "nacos/v1/cs/configs";

/// Polls a remote configuration service for the route document.
pub struct RemotePoller {
    client: reqwest::Client,
    url: Url,
    config: RemoteSourceConfig,
    retry: RetryConfig,
    update_tx: mpsc::UnboundedSender<Payload>,
}

impl RemotePoller {
    /// Create a new poller.
    ///
    /// Returns the poller and a receiver for route payloads.
    pub fn new(
        config: RemoteSourceConfig,
        retry: RetryConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Payload>), WatchError> {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let url = config_url(&config)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|source| WatchError::Request {
                url: url.to_string(),
                source,
            })?;

        Ok((
            Self {
                client,
                url,
                config,
                retry,
                update_tx,
            },
            update_rx,
        ))
    }

    /// The URL the document is fetched from.
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn source_id(&self) -> String {
        format!("remote:{}/{}", self.config.group, self.config.data_id)
    }

    /// Fetch the document once.
    pub async fn fetch(&self) -> Result<Payload, WatchError> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|source| WatchError::Request {
                url: self.url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(WatchError::Status {
                url: self.url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|source| WatchError::Request {
            url: self.url.to_string(),
            source,
        })?;

        Ok(Payload {
            bytes: bytes.to_vec(),
            format: self.config.format,
            source: self.source_id(),
        })
    }

    /// Poll until shutdown, or until `retry.max_attempts` consecutive failures.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            url = %self.url,
            interval = self.config.poll_interval_secs,
            "Remote route poller starting"
        );

        let interval = Duration::from_secs(self.config.poll_interval_secs);
        let mut last: Option<Vec<u8>> = None;
        let mut failures: u32 = 0;

        loop {
            let delay = match self.fetch().await {
                Ok(payload) => {
                    failures = 0;
                    if last.as_deref() != Some(payload.bytes.as_slice()) {
                        tracing::debug!(source = %payload.source, bytes = payload.bytes.len(), "Route document changed");
                        last = Some(payload.bytes.clone());
                        if self.update_tx.send(payload).is_err() {
                            tracing::info!("Route update loop gone, poller exiting");
                            break;
                        }
                    }
                    interval
                }
                Err(e) => {
                    failures += 1;
                    metrics::record_fetch_failure("remote");
                    if self.retry.max_attempts > 0 && failures >= self.retry.max_attempts {
                        tracing::error!(
                            error = %e,
                            attempts = failures,
                            "Route source unreachable, giving up. Keeping current routes."
                        );
                        break;
                    }
                    let backoff = backoff_for(&self.retry, failures);
                    tracing::warn!(
                        error = %e,
                        kind = %e.kind(),
                        attempt = failures,
                        delay = ?backoff,
                        "Route fetch failed, retrying"
                    );
                    backoff
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.recv() => {
                    tracing::info!("Remote poller received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

/// Build the document URL for a remote source.
pub fn config_url(config: &RemoteSourceConfig) -> Result<Url, url::ParseError> {
    let mut base = config.server_addr.clone();
    if !base.ends_with('/') {
        base.push('/');
    }
    let mut url = Url::parse(&base)?.join(CONFIG_PATH)?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("dataId", &config.data_id)
            .append_pair("group", &config.group);
        if !config.namespace.is_empty() {
            query.append_pair("tenant", &config.namespace);
        }
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_url() {
        let config = RemoteSourceConfig {
            server_addr: "http://nacos:8848".into(),
            data_id: "gateway-routes".into(),
            ..Default::default()
        };
        assert_eq!(
            config_url(&config).unwrap().as_str(),
            "http://nacos:8848/nacos/v1/cs/configs?dataId=gateway-routes&group=DEFAULT_GROUP"
        );
    }

    #[test]
    fn test_config_url_with_namespace_and_prefix() {
        let config = RemoteSourceConfig {
            server_addr: "https://cfg.example.com/api".into(),
            data_id: "routes".into(),
            group: "GATEWAY".into(),
            namespace: "prod".into(),
            ..Default::default()
        };
        assert_eq!(
            config_url(&config).unwrap().as_str(),
            "https://cfg.example.com/api/nacos/v1/cs/configs?dataId=routes&group=GATEWAY&tenant=prod"
        );
    }
}
