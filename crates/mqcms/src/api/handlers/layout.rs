//! Section assignments and the combined layout read displays poll.

use axum::{
    Json,
    extract::{Path, State},
};
use mqcms_protocol::Envelope;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::{ApiError, ApiResult, AppState};
use crate::auth::RequireAdmin;
use crate::display::{Assignment, DisplaySettings, SectionAssignments};
use crate::storage::{ObjectMetadata, is_media_key};

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub section_key: String,
}

/// A stored media object as a display renders it.
#[derive(Debug, Serialize)]
pub struct MediaItem {
    pub key: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub section_key: Option<String>,
}

impl MediaItem {
    fn new(object: ObjectMetadata, assignments: &SectionAssignments) -> Self {
        let kind = if object.content_type.starts_with("video/") {
            "video"
        } else {
            "image"
        };
        Self {
            url: format!("/media/{}", object.key),
            section_key: assignments.section_of(&object.key).map(str::to_owned),
            key: object.key,
            kind,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MediaWithSettings {
    pub media: Vec<MediaItem>,
    pub settings: DisplaySettings,
}

/// GET /api/assignments
pub async fn list_assignments(State(state): State<AppState>) -> ApiResult<Json<Vec<Assignment>>> {
    let assignments = SectionAssignments::load(state.documents.as_ref()).await?;
    Ok(Json(assignments.to_list()))
}

/// PUT /api/assignments/{key}
pub async fn put_assignment(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(request): Json<AssignRequest>,
) -> ApiResult<Json<Assignment>> {
    if !is_media_key(&key) {
        return Err(ApiError::bad_request(format!("'{key}' is not a media key")));
    }
    // only stored media can be placed
    state.media.metadata(&key).await?;

    let assignment = assign_section(&state, &key, &request.section_key).await?;
    info!("Assigned {} to {}", key, assignment.section_key);

    state.notify(Envelope::playlist_updated()).await;
    Ok(Json(assignment))
}

/// DELETE /api/assignments/{key}
pub async fn delete_assignment(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<Assignment>> {
    let section_key = unassign_media(&state, &key)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no assignment for {key}")))?;
    info!("Removed {} from {}", key, section_key);

    state.notify(Envelope::playlist_updated()).await;
    Ok(Json(Assignment { key, section_key }))
}

/// GET /api/media_with_settings
pub async fn media_with_settings(
    State(state): State<AppState>,
) -> ApiResult<Json<MediaWithSettings>> {
    let objects = state.media.list().await?;
    let assignments = SectionAssignments::load(state.documents.as_ref()).await?;
    let settings = DisplaySettings::load(state.documents.as_ref()).await?;

    let media = objects
        .into_iter()
        .filter(|object| is_media_key(&object.key))
        .map(|object| MediaItem::new(object, &assignments))
        .collect();
    Ok(Json(MediaWithSettings { media, settings }))
}

/// Place `key` in `section` and persist the change.
pub(crate) async fn assign_section(
    state: &AppState,
    key: &str,
    section: &str,
) -> ApiResult<Assignment> {
    let _guard = state.layout_lock.lock().await;
    let mut assignments = SectionAssignments::load(state.documents.as_ref()).await?;
    let assignment = assignments.assign(key, section)?;
    assignments.save(state.documents.as_ref()).await?;
    Ok(assignment)
}

/// Drop the placement of `key`, if any, and persist the change.
pub(crate) async fn unassign_media(state: &AppState, key: &str) -> ApiResult<Option<String>> {
    let _guard = state.layout_lock.lock().await;
    let mut assignments = SectionAssignments::load(state.documents.as_ref()).await?;
    let removed = assignments.unassign(key);
    if removed.is_some() {
        assignments.save(state.documents.as_ref()).await?;
    }
    Ok(removed)
}
