//! Startup orchestration.
//!
//! # Responsibilities
//! - Create the route table and register its observers
//! - Start the configured route source and the update loop
//! - Bind the admin API
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Observers subscribe before the source starts, so the first table is audited
//! - The table starts `Empty`; the source's first payload populates it

use std::net::SocketAddr;
use std::sync::Arc;

use notify::RecommendedWatcher;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::admin::{self, AdminState};
use crate::config::remote::RemotePoller;
use crate::config::watcher::{apply_updates, ConfigWatcher, WatchError};
use crate::config::{EngineConfig, SourceConfig};
use crate::lifecycle::shutdown::Shutdown;
use crate::observability::{audit, metrics};
use crate::routing::{RouteTableManager, SharedRouteTable};

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("route source failed to start: {0}")]
    Source(#[from] WatchError),

    #[error("invalid {field} `{value}`")]
    Address { field: &'static str, value: String },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// A running engine.
pub struct Engine {
    table: SharedRouteTable,
    shutdown: Shutdown,
    tasks: Vec<JoinHandle<()>>,
    admin_addr: Option<SocketAddr>,
    // Dropping the watcher stops file notifications.
    _watcher: Option<RecommendedWatcher>,
}

impl Engine {
    /// The route table served by this engine.
    pub fn table(&self) -> &SharedRouteTable {
        &self.table
    }

    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Address the admin API is bound to, if enabled.
    pub fn admin_addr(&self) -> Option<SocketAddr> {
        self.admin_addr
    }

    /// Wait for every background task to finish after shutdown.
    pub async fn join(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Engine task failed");
            }
        }
    }
}

/// Start every subsystem described by `config`.
pub async fn start(config: EngineConfig) -> Result<Engine, StartupError> {
    let table: SharedRouteTable = Arc::new(RouteTableManager::new());
    audit::subscribe_audit_log(&table);

    if config.observability.metrics_enabled {
        let addr = parse_addr(
            "observability.metrics_address",
            &config.observability.metrics_address,
        )?;
        metrics::init_metrics(addr);
        metrics::subscribe_table_metrics(&table);
    }

    let shutdown = Shutdown::new();
    let mut tasks = Vec::new();

    let (watcher, updates) = match config.source {
        SourceConfig::File(file) => {
            let (watcher, updates) = ConfigWatcher::new(&file);
            (Some(watcher.run()?), updates)
        }
        SourceConfig::Remote(remote) => {
            let (poller, updates) = RemotePoller::new(remote, config.retry.clone())?;
            tasks.push(tokio::spawn(poller.run(shutdown.subscribe())));
            (None, updates)
        }
    };

    tasks.push(tokio::spawn(apply_updates(
        table.clone(),
        updates,
        shutdown.subscribe(),
    )));

    let mut admin_addr = None;
    if config.admin.enabled {
        let addr = parse_addr("admin.bind_address", &config.admin.bind_address)?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| StartupError::Bind { addr, source })?;
        admin_addr = listener.local_addr().ok();

        let state = AdminState::new(table.clone(), config.admin.api_key.as_str());
        let signalled = shutdown.signalled();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = admin::serve(listener, state, signalled).await {
                tracing::error!(error = %e, "Admin API failed");
            }
        }));
    }

    tracing::info!(tasks = tasks.len(), "Engine started");

    Ok(Engine {
        table,
        shutdown,
        tasks,
        admin_addr,
        _watcher: watcher,
    })
}

fn parse_addr(field: &'static str, value: &str) -> Result<SocketAddr, StartupError> {
    value.parse().map_err(|_| StartupError::Address {
        field,
        value: value.to_string(),
    })
}
