//! HTTP request handlers

use super::types::{ChatRequest, ErrorResponse};
use super::AppState;
use crate::relay::RelayRequest;
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use std::convert::Infallible;

/// Header carrying the thread a structured request continues
pub const THREAD_ID_HEADER: &str = "x-thread-id";

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/assistant", post(relay).options(preflight))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Stream the assistant's answer as chunked plain text.
///
/// Once the body starts, failures arrive in-band as an `Error:` chunk and
/// the status stays 200.
async fn relay(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let request = parse_request(&headers, &body)?;
    tracing::info!(
        mode = ?request.mode,
        thread_id = ?request.thread_id,
        files = request.file_ids.len(),
        "Relay request accepted"
    );

    let chunks = state
        .orchestrator
        .stream(request)
        .map(|chunk| Ok::<_, Infallible>(Bytes::from(chunk)));

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::TRANSFER_ENCODING, "chunked"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(chunks),
    )
        .into_response())
}

fn parse_request(headers: &HeaderMap, body: &[u8]) -> Result<RelayRequest, AppError> {
    let request = if is_json(headers) {
        let chat: ChatRequest = serde_json::from_slice(body)
            .map_err(|e| AppError::Internal(format!("Invalid request body: {e}")))?;
        let thread_id = headers
            .get(THREAD_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        RelayRequest::structured(chat.message, chat.file_ids, thread_id)
    } else {
        let text = std::str::from_utf8(body)
            .map_err(|e| AppError::Internal(format!("Invalid request body: {e}")))?;
        RelayRequest::legacy(text)
    };

    if request.message.trim().is_empty() {
        return Err(AppError::BadRequest("Message must not be empty".to_string()));
    }
    Ok(request)
}

/// Only an `application/json` content type selects the structured shape.
/// A JSON body sent as `text/plain` (the `fetch` default for string
/// bodies) is relayed verbatim as a raw-text query.
fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        tracing::warn!(%status, error = %message, "Request rejected");

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
