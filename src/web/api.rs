//! REST route handlers.
//!
//! Every failure is answered with a `{"error": "..."}` body. Validation
//! messages are passed through; storage failures are logged and replaced by a
//! fixed per-route message.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::domain::{BatchReorderRequest, CardId, CardPatch, CreateCard, ReorderRequest};
use crate::error::{BoardError, ErrorKind};
use crate::web::state::AppState;

/// Build the error response for `err`; `failure` is shown instead of the
/// message when storage failed.
fn error_response(err: &BoardError, failure: &'static str) -> Response {
    let (status, message) = match err.kind() {
        ErrorKind::Validation => (StatusCode::BAD_REQUEST, err.to_string()),
        ErrorKind::NotFound => (StatusCode::NOT_FOUND, "Card not found.".to_string()),
        ErrorKind::Persistence | ErrorKind::Configuration => {
            tracing::error!(error = %err, "{failure}");
            (StatusCode::INTERNAL_SERVER_ERROR, failure.to_string())
        }
    };
    (status, Json(json!({ "error": message }))).into_response()
}

fn bad_body(rejection: JsonRejection) -> Response {
    tracing::debug!(error = %rejection, "rejected request body");
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "Invalid request body." })),
    )
        .into_response()
}

fn parse_id(raw: &str) -> Result<CardId, Response> {
    raw.parse::<CardId>()
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))).into_response())
}

// ---------------------------------------------------------------------------
// /records
// ---------------------------------------------------------------------------

/// GET /records: every card ordered by (lane, position, id).
pub async fn list_records(State(state): State<Arc<AppState>>) -> Response {
    match state.board.list().await {
        Ok(cards) => (StatusCode::OK, Json(cards)).into_response(),
        Err(e) => error_response(&e, "Unable to load cards."),
    }
}

/// GET /records/{id}
pub async fn get_record(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state.board.get(id).await {
        Ok(card) => (StatusCode::OK, Json(card)).into_response(),
        Err(e) => error_response(&e, "Unable to load card."),
    }
}

/// POST /records: append a card to its lane.
pub async fn create_record(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateCard>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => return bad_body(rejection),
    };
    match state.board.create(request).await {
        Ok(card) => (StatusCode::CREATED, Json(card)).into_response(),
        Err(e) => error_response(&e, "Unable to create card."),
    }
}

/// PATCH /records/{id}: change only the provided fields.
pub async fn patch_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<CardPatch>, JsonRejection>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let Json(patch) = match payload {
        Ok(body) => body,
        Err(rejection) => return bad_body(rejection),
    };
    match state.board.patch(id, patch).await {
        Ok(card) => (StatusCode::OK, Json(card)).into_response(),
        Err(e) => error_response(&e, "Unable to update card."),
    }
}

/// DELETE /records/{id}
pub async fn delete_record(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state.board.delete(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e, "Unable to delete card."),
    }
}

// ---------------------------------------------------------------------------
// /reorder
// ---------------------------------------------------------------------------

/// POST /reorder with `{lane, orderedIds}`.
pub async fn reorder(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ReorderRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => return bad_body(rejection),
    };
    match state.board.reorder(request).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e, "Unable to reorder cards."),
    }
}

/// POST /reorder/batch with `{lanes: {lane: [ids]}}`, committed together.
pub async fn reorder_batch(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BatchReorderRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => return bad_body(rejection),
    };
    match state.board.reorder_batch(request).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e, "Unable to reorder cards."),
    }
}

// ---------------------------------------------------------------------------
// /health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub database: &'static str,
}

/// GET /health, 503 when the database does not answer.
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    if state.board.is_healthy().await {
        (
            StatusCode::OK,
            Json(HealthResponse {
                ok: true,
                database: "connected",
            }),
        )
            .into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                ok: false,
                database: "unavailable",
            }),
        )
            .into_response()
    }
}
