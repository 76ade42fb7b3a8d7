//! Dynamic route table engine.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────┐      ┌──────────────────────────────────────────────┐
//!   │ route document       │      │                ROUTE ENGINE                  │
//!   │  file (notify)       │─────▶│  ┌────────┐   ┌────────┐   ┌──────────────┐  │
//!   │  config service      │      │  │ parser │──▶│  diff  │──▶│   manager    │  │
//!   │  (HTTP poll)         │      │  └────────┘   └────────┘   │ atomic swap  │  │
//!   └──────────────────────┘      │                            └──────┬───────┘  │
//!                                 │                                   │          │
//!                                 │            ┌──────────────────────┼───────┐  │
//!   lookup(request attributes) ───┼──────────▶ │ immutable snapshot v(n)      │  │
//!                                 │            └──────────────────────────────┘  │
//!                                 │                                   │          │
//!                                 │     subscribers: audit log, metrics ◀──┘     │
//!                                 │     admin API: status, routes, apply, lookup │
//!                                 └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use route_engine::config::loader::load_config;
use route_engine::config::EngineConfig;
use route_engine::lifecycle::{self, signals};
use route_engine::observability::logging;

#[derive(Parser)]
#[command(name = "route-engine")]
#[command(about = "Dynamic route table engine for API gateways", long_about = None)]
struct Args {
    /// Engine configuration file (TOML). Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };

    logging::init_logging(&config.observability)?;

    tracing::info!("route-engine v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        config = ?args.config,
        source = ?config.source,
        admin_enabled = config.admin.enabled,
        metrics_enabled = config.observability.metrics_enabled,
        "Configuration loaded"
    );

    let engine = lifecycle::start(config).await?;
    signals::shutdown_on_signal(engine.shutdown_handle()).await;
    engine.join().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
