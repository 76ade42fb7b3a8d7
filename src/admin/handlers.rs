use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::config::watcher::{apply_payload, Payload};
use crate::routing::{ErrorKind, ManagerState, PayloadFormat, RequestAttributes, RouteError, RouteSpec};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub state: ManagerState,
    pub table_version: u64,
    pub routes: usize,
}

#[derive(Serialize)]
pub struct RouteListing<'a> {
    pub table_version: u64,
    pub routes: Vec<&'a RouteSpec>,
}

#[derive(Serialize)]
pub struct Applied {
    pub table_version: u64,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub index: Option<usize>,
    pub field: Option<&'static str>,
    pub message: String,
}

impl From<&RouteError> for ErrorBody {
    fn from(e: &RouteError) -> Self {
        Self {
            kind: e.kind(),
            index: e.index(),
            field: e.field_name(),
            message: e.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ApplyParams {
    pub format: Option<PayloadFormat>,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let snapshot = state.table.snapshot();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        state: state.table.state(),
        table_version: snapshot.as_ref().map_or(0, |s| s.version()),
        routes: snapshot.as_ref().map_or(0, |s| s.len()),
    })
}

pub async fn get_routes(State(state): State<AdminState>) -> Response {
    let snapshot = state.table.snapshot();
    let listing = RouteListing {
        table_version: snapshot.as_ref().map_or(0, |s| s.version()),
        routes: snapshot
            .as_ref()
            .map(|s| s.routes().iter().map(|r| &**r).collect())
            .unwrap_or_default(),
    };
    Json(listing).into_response()
}

/// Apply a raw route payload pushed by an operator.
pub async fn post_routes(
    State(state): State<AdminState>,
    Query(params): Query<ApplyParams>,
    body: Bytes,
) -> Response {
    let payload = Payload {
        bytes: body.to_vec(),
        format: params.format.unwrap_or_default(),
        source: "admin".to_string(),
    };
    let result = match apply_payload(&state.table, payload).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, "Route apply task failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match result {
        Ok(table_version) => Json(Applied { table_version }).into_response(),
        Err(e) => (StatusCode::UNPROCESSABLE_ENTITY, Json(ErrorBody::from(&e))).into_response(),
    }
}

pub async fn post_lookup(
    State(state): State<AdminState>,
    Json(attrs): Json<RequestAttributes>,
) -> Response {
    match state.table.lookup(&attrs.normalized()) {
        Some(route) => Json(&*route).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "no matching route" })),
        )
            .into_response(),
    }
}
