//! Development forward target
//!
//! Accepts any `POST`, logs what arrived and answers 200.

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::json;
use tracing::{info, warn};

/// Router answering every path
pub fn recv_router() -> Router {
    Router::new().fallback(echo)
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    if method != Method::POST {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(path = %uri.path(), error = %e, "Received non-JSON body");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": format!("invalid JSON: {e}") })),
            )
                .into_response();
        }
    };

    let headers: Vec<(String, String)> = headers
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    info!(path = %uri.path(), body = %payload, headers = ?headers, "Received forward");

    (StatusCode::OK, Json(json!({ "success": "true" }))).into_response()
}
