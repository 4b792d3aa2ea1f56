use axum::{
    Json,
    extract::{State, WebSocketUpgrade, ws::rejection::WebSocketUpgradeRejection},
    http::{Method, StatusCode, Uri},
    response::Response,
};
use serde::Serialize;

use crate::api::{ApiError, AppState};
use crate::ws::upgrade_to_hub;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Any unmatched /api/* route.
///
/// Displays may open their socket on any realtime path, so an upgrade request
/// here joins the default hub. Everything else is a JSON 404.
pub async fn api_fallback(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ApiError> {
    match upgrade {
        Ok(ws) => Ok(upgrade_to_hub(&state, ws)),
        Err(_) => Err(ApiError::not_found(format!(
            "no route for {} {}",
            method,
            uri.path()
        ))),
    }
}

/// Fallback when no static asset matches.
pub async fn static_not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}
