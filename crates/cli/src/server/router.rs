//! Ingestion routes

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{ConnectInfo, DefaultBodyLimit, Path, State};
use axum::http::{Extensions, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use ingestion::InboundRequest;
use serde_json::json;
use tracing::debug;

use crate::app::AppHandler;

/// `POST /buckets/{slug}` and `GET /api/health`
pub fn router(handler: Arc<AppHandler>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/buckets/{slug}", post(receive))
        .route("/api/health", get(health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(handler)
}

async fn receive(
    State(handler): State<Arc<AppHandler>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    extensions: Extensions,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            debug!(slug = %slug, error = %rejection, "Request body rejected");
            return error_response(rejection.status(), &rejection.body_text());
        }
    };
    let peer = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let inbound = InboundRequest {
        slug: &slug,
        body: &body,
        headers: &headers,
        peer,
    };
    match handler.receive(inbound).await {
        Ok(_accepted) => (StatusCode::OK, Json(json!({ "success": "true" }))).into_response(),
        Err(e) => error_response(e.status_code(), &e.public_message()),
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "code": 200, "message": "API is healthy." }))
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}
