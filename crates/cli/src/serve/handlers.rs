//! Route handlers: health, produce queries, registration, updates.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use tracker_core::{Actor, ErrorKind, NewProduce, NewUpdate, LEDGER_FORMAT_VERSION};
use tracker_storage::LedgerError;

use super::state::{AppState, Caller};
use super::{json_error, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::render::{history_json, produce_json, update_json, view_json};

/// Map a ledger failure to a JSON error response.
fn ledger_error(err: &LedgerError) -> Response {
    let status = match err.kind() {
        Some(ErrorKind::InvalidArgument) => StatusCode::BAD_REQUEST,
        Some(ErrorKind::NotFound) => StatusCode::NOT_FOUND,
        Some(ErrorKind::Conflict) => StatusCode::CONFLICT,
        None => {
            tracing::error!(error = %err, "ledger storage failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let kind = err.kind().map(|k| k.as_str()).unwrap_or("internal");
    json_error(status, kind, &err.to_string()).into_response()
}

/// Parse a path id. Non-numeric ids are invalid arguments, not misses.
fn parse_id(raw: &str) -> Result<u64, Response> {
    raw.parse::<u64>().map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            ErrorKind::InvalidArgument.as_str(),
            &format!("invalid produce id '{}'", raw),
        )
        .into_response()
    })
}

/// The actor for a write, or 401 when the caller is anonymous.
fn require_principal(caller: &Caller) -> Result<&Actor, Response> {
    match caller {
        Caller::Principal(actor) => Ok(actor),
        Caller::Anonymous => Err(json_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "authentication required",
        )
        .into_response()),
    }
}

/// Decode a request body into a typed request, reporting failures as 400.
fn decode_body<T: serde::de::DeserializeOwned>(body: serde_json::Value) -> Result<T, Response> {
    serde_json::from_value(body).map_err(|e| {
        json_error(
            StatusCode::BAD_REQUEST,
            ErrorKind::InvalidArgument.as_str(),
            &format!("invalid request body: {}", e),
        )
        .into_response()
    })
}

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not_found", "not found")
}

/// GET /health
pub(crate) async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "ledger_format": LEDGER_FORMAT_VERSION,
        "produces": state.ledger.total_produces().await,
    });
    (StatusCode::OK, Json(response))
}

/// GET /produces/total
pub(crate) async fn handle_total(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let total = state.ledger.total_produces().await;
    (StatusCode::OK, Json(serde_json::json!({ "total": total })))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListParams {
    #[serde(default)]
    offset: u64,
    limit: Option<usize>,
}

/// GET /produces?offset=&limit=
pub(crate) async fn handle_list_produces(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
    let total = state.ledger.total_produces().await;
    let views = state.ledger.produces(params.offset, limit).await;
    let response = serde_json::json!({
        "total": total,
        "offset": params.offset,
        "limit": limit,
        "produces": views.iter().map(view_json).collect::<Vec<_>>(),
    });
    (StatusCode::OK, Json(response))
}

/// GET /produces/{id}
pub(crate) async fn handle_get_produce(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Response {
    let id = match parse_id(&raw_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.ledger.get_produce(id).await {
        Ok(record) => (StatusCode::OK, Json(produce_json(&record))).into_response(),
        Err(e) => ledger_error(&e),
    }
}

/// GET /produces/{id}/history
pub(crate) async fn handle_get_history(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Response {
    let id = match parse_id(&raw_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.ledger.get_history(id).await {
        Ok(history) => (StatusCode::OK, Json(history_json(id, &history))).into_response(),
        Err(e) => ledger_error(&e),
    }
}

/// POST /produces
pub(crate) async fn handle_register(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let actor = match require_principal(&caller) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let request: NewProduce = match decode_body(body) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match state.ledger.register_produce(actor, request).await {
        Ok(id) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "id": id, "actor": actor.as_str() })),
        )
            .into_response(),
        Err(e) => ledger_error(&e),
    }
}

/// POST /produces/{id}/updates
pub(crate) async fn handle_append_update(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(raw_id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let actor = match require_principal(&caller) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let id = match parse_id(&raw_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let request: NewUpdate = match decode_body(body) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match state.ledger.append_update(actor, id, request).await {
        Ok(update) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "id": id, "update": update_json(&update) })),
        )
            .into_response(),
        Err(e) => ledger_error(&e),
    }
}
