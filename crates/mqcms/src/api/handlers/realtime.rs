//! Stats and publish endpoints backed by the broadcast hub.

use axum::{Json, extract::State};
use mqcms_protocol::Envelope;
use serde::Serialize;
use serde_json::Value;

use crate::api::{ApiResult, AppState};
use crate::auth::RequireAdmin;
use crate::ws::{HubStats, PublishAck};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub success: bool,
    pub message: String,
    pub connection_count: usize,
    pub delivered: usize,
}

impl PublishResponse {
    fn new(message: impl Into<String>, ack: PublishAck) -> Self {
        Self {
            success: true,
            message: message.into(),
            connection_count: ack.connection_count,
            delivered: ack.delivered,
        }
    }
}

/// GET /api/stats
pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<HubStats>> {
    Ok(Json(state.hub().stats().await?))
}

/// POST /api/message
///
/// The raw request body becomes the `data` of a `broadcast` envelope.
pub async fn post_message(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    body: String,
) -> ApiResult<Json<PublishResponse>> {
    let ack = state.hub().publish_data(Value::String(body)).await?;
    Ok(Json(PublishResponse::new(
        "Message broadcasted successfully",
        ack,
    )))
}

/// POST /api/media_updated
pub async fn media_updated(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> ApiResult<Json<PublishResponse>> {
    publish_update(&state, Envelope::media_updated()).await
}

/// POST /api/settings_updated
pub async fn settings_updated(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> ApiResult<Json<PublishResponse>> {
    publish_update(&state, Envelope::settings_updated()).await
}

/// POST /api/playlist_updated
pub async fn playlist_updated(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> ApiResult<Json<PublishResponse>> {
    publish_update(&state, Envelope::playlist_updated()).await
}

async fn publish_update(state: &AppState, update: Envelope) -> ApiResult<Json<PublishResponse>> {
    let message = format!("{} broadcast", update.kind);
    let ack = state.hub().publish(update).await?;
    Ok(Json(PublishResponse::new(message, ack)))
}
