//! Display settings endpoints.

use axum::{Json, extract::State};
use mqcms_protocol::Envelope;
use tracing::info;

use crate::api::{ApiResult, AppState};
use crate::auth::RequireAdmin;
use crate::display::DisplaySettings;

/// GET /api/settings
pub async fn get_settings(State(state): State<AppState>) -> ApiResult<Json<DisplaySettings>> {
    let settings = DisplaySettings::load(state.documents.as_ref()).await?;
    Ok(Json(settings))
}

/// PUT /api/settings
pub async fn put_settings(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Json(settings): Json<DisplaySettings>,
) -> ApiResult<Json<DisplaySettings>> {
    settings.validate()?;
    settings.save(state.documents.as_ref()).await?;
    info!(
        "Saved display settings for {} sections",
        settings.section_intervals.len()
    );

    state.notify(Envelope::settings_updated()).await;
    Ok(Json(settings))
}
