//! Admin API.
//!
//! # Endpoints
//! - `GET /admin/status`: engine and table state
//! - `GET /admin/routes`: routes of the current snapshot
//! - `POST /admin/routes[?format=toml]`: apply a raw payload
//! - `POST /admin/lookup`: resolve JSON request attributes to a route
//!
//! All endpoints require `Authorization: Bearer <admin.api_key>`.

pub mod auth;
pub mod handlers;

use std::future::Future;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::routing::SharedRouteTable;

/// State injected into admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub table: SharedRouteTable,
    pub api_key: Arc<str>,
}

impl AdminState {
    pub fn new(table: SharedRouteTable, api_key: impl Into<Arc<str>>) -> Self {
        Self {
            table,
            api_key: api_key.into(),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/routes", get(get_routes).post(post_routes))
        .route("/admin/lookup", post(post_lookup))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the admin API until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AdminState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Admin API listening");

    axum::serve(listener, setup_admin_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Admin API stopped");
    Ok(())
}
