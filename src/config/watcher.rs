//! Route document file watcher for hot reload.
//!
//! Payloads flow from a source (this file watcher or the remote poller in
//! `remote.rs`) through an mpsc channel into [`apply_updates`], which is the
//! only place that calls into the route table manager.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinError;

use crate::config::schema::FileSourceConfig;
use crate::observability::metrics;
use crate::routing::{ErrorKind, PayloadFormat, RouteError, SharedRouteTable};

/// A raw route payload delivered by a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub bytes: Vec<u8>,
    pub format: PayloadFormat,
    /// Identifier of the source, for error attribution.
    pub source: String,
}

/// Failures fetching a payload. Handled by the source; never reach the manager.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("file watch error: {0}")]
    Notify(#[from] notify::Error),

    #[error("invalid source URL: {0}")]
    Url(#[from] url::ParseError),
}

impl WatchError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::TransportFailure
    }
}

/// A watcher that monitors the route document for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    format: PayloadFormat,
    poll_interval: Duration,
    update_tx: mpsc::UnboundedSender<Payload>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for route payloads.
    pub fn new(config: &FileSourceConfig) -> (Self, mpsc::UnboundedReceiver<Payload>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: config.path.clone(),
                format: config.effective_format(),
                poll_interval: Duration::from_secs(config.poll_interval_secs),
                update_tx,
            },
            update_rx,
        )
    }

    /// Read the route document once.
    pub fn read_payload(&self) -> Result<Payload, WatchError> {
        read_payload(&self.path, self.format)
    }

    /// Send the current document, then watch for changes in a background thread.
    ///
    /// The parent directory is watched so editors that replace the file on
    /// save are still observed. Dropping the returned watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher, WatchError> {
        match self.read_payload() {
            Ok(payload) => {
                forward(&self.update_tx, payload);
            }
            Err(e) => {
                metrics::record_fetch_failure("file");
                tracing::error!(error = %e, "Initial route document unavailable, waiting for changes");
            }
        }

        let tx = self.update_tx.clone();
        let path = self.path.clone();
        let format = self.format;
        let file_name = self.path.file_name().map(|n| n.to_os_string());

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let relevant = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if relevant && (event.kind.is_modify() || event.kind.is_create()) {
                        tracing::info!(path = %path.display(), "Route document change detected, reloading...");
                        match read_payload(&path, format) {
                            Ok(payload) => {
                                forward(&tx, payload);
                            }
                            Err(e) => {
                                metrics::record_fetch_failure("file");
                                tracing::error!(
                                    error = %e,
                                    "Failed to read route document. Keeping current routes."
                                );
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(self.poll_interval),
        )?;

        watcher.watch(watch_dir(&self.path), RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, format = %self.format, "Route watcher started");
        Ok(watcher)
    }
}

/// Hand a payload to the update loop. Returns false once the loop is gone.
fn forward(tx: &mpsc::UnboundedSender<Payload>, payload: Payload) -> bool {
    let source = payload.source.clone();
    if tx.send(payload).is_err() {
        tracing::warn!(source = %source, "Route update loop gone, dropping document");
        return false;
    }
    true
}

fn watch_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}

fn read_payload(path: &Path, format: PayloadFormat) -> Result<Payload, WatchError> {
    let bytes = std::fs::read(path).map_err(|source| WatchError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Payload {
        bytes,
        format,
        source: format!("file:{}", path.display()),
    })
}

/// Apply a payload on the blocking pool, keeping parsing and subscriber
/// callbacks off the async workers.
pub async fn apply_payload(
    table: &SharedRouteTable,
    payload: Payload,
) -> Result<Result<u64, RouteError>, JoinError> {
    let table = Arc::clone(table);
    tokio::task::spawn_blocking(move || {
        let result = table.apply_from(&payload.bytes, payload.format, &payload.source);
        metrics::record_apply(&result);
        result
    })
    .await
}

/// Apply every payload from `updates` to the route table until the channel
/// closes or shutdown is signalled.
///
/// Rejected payloads are logged; the table keeps serving the last good version.
pub async fn apply_updates(
    table: SharedRouteTable,
    mut updates: mpsc::UnboundedReceiver<Payload>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            maybe = updates.recv() => {
                let Some(payload) = maybe else {
                    tracing::info!("Route sources closed, update loop exiting");
                    break;
                };
                let source = payload.source.clone();
                let result = match apply_payload(&table, payload).await {
                    Ok(result) => result,
                    Err(e) => {
                        tracing::error!(source = %source, error = %e, "Route apply task failed");
                        continue;
                    }
                };
                if let Err(e) = result {
                    tracing::error!(
                        source = %source,
                        kind = %e.kind(),
                        index = ?e.index(),
                        field = ?e.field_name(),
                        error = %e,
                        "Route payload rejected"
                    );
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("Route update loop received shutdown signal, exiting loop");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_dir_of_relative_file() {
        assert_eq!(watch_dir(Path::new("routes.json")), Path::new("."));
        assert_eq!(watch_dir(Path::new("/etc/gw/routes.json")), Path::new("/etc/gw"));
    }

    #[test]
    fn test_read_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.toml");
        std::fs::write(&path, "[[routes]]\n").unwrap();

        let config = FileSourceConfig {
            path: path.clone(),
            ..Default::default()
        };
        let (watcher, _rx) = ConfigWatcher::new(&config);
        let payload = watcher.read_payload().unwrap();
        assert_eq!(payload.format, PayloadFormat::Toml);
        assert!(payload.source.starts_with("file:"));

        std::fs::remove_file(&path).unwrap();
        let err = watcher.read_payload().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransportFailure);
    }

    #[test]
    fn test_forward_reports_closed_update_loop() {
        let (tx, rx) = mpsc::unbounded_channel();
        let payload = Payload {
            bytes: b"[]".to_vec(),
            format: PayloadFormat::Json,
            source: "file:routes.json".into(),
        };
        assert!(forward(&tx, payload.clone()));
        drop(rx);
        assert!(!forward(&tx, payload));
    }

    #[tokio::test]
    async fn test_apply_payload_runs_off_the_async_worker() {
        let table: SharedRouteTable = Arc::new(crate::routing::RouteTableManager::new());
        let ok = Payload {
            bytes: br#"[{"id":"a","path":"/a","target":"svc"}]"#.to_vec(),
            format: PayloadFormat::Json,
            source: "test".into(),
        };
        assert_eq!(apply_payload(&table, ok).await.unwrap(), Ok(1));

        let bad = Payload {
            bytes: b"not json".to_vec(),
            format: PayloadFormat::Json,
            source: "test".into(),
        };
        let err = apply_payload(&table, bad).await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
        assert_eq!(table.version(), 1);
    }
}
