//! Media upload, listing, deletion and download.

use axum::{
    Json,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use mqcms_protocol::Envelope;
use serde::Serialize;
use tracing::{debug, info};

use crate::api::{ApiError, ApiResult, AppState};
use crate::auth::RequireAdmin;
use crate::display::{SettingsError, is_section};
use crate::storage::{is_media_key, media_key};

use super::layout::{assign_section, unassign_media};

/// Multipart field carrying the uploaded file.
const FILE_FIELD: &str = "file";
/// Optional multipart field naming the section to show the upload in.
const SECTION_FIELD: &str = "section_key";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub key: String,
    pub original_name: String,
    pub size: u64,
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub key: String,
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large(err.body_text())
    } else {
        ApiError::bad_request(err.body_text())
    }
}

/// GET /api/media
pub async fn list_media(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    let keys = state
        .media
        .list()
        .await?
        .into_iter()
        .map(|object| object.key)
        .filter(|key| is_media_key(key))
        .collect();
    Ok(Json(keys))
}

/// POST /api/media
pub async fn upload_media(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let mut upload = None;
    let mut section = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some(FILE_FIELD) if upload.is_none() => {
                let original_name = field
                    .file_name()
                    .map(str::to_owned)
                    .ok_or_else(|| ApiError::bad_request("the file field has no file name"))?;
                let data = field.bytes().await.map_err(multipart_error)?;
                upload = Some((original_name, data));
            }
            Some(SECTION_FIELD) => {
                let value = field.text().await.map_err(multipart_error)?;
                section = Some(value.trim().to_string()).filter(|s| !s.is_empty());
            }
            _ => {}
        }
    }

    let (original_name, data) =
        upload.ok_or_else(|| ApiError::bad_request("missing 'file' field"))?;
    if data.is_empty() {
        return Err(ApiError::bad_request("uploaded file is empty"));
    }
    if let Some(section) = section.as_deref().filter(|name| !is_section(name)) {
        return Err(SettingsError::UnknownSection(section.to_string()).into());
    }

    let key = media_key(&original_name, Utc::now().timestamp_millis())?;
    let stored = state.media.put(&key, data).await?;
    info!("Stored media {} ({} bytes)", stored.key, stored.size);

    let section_key = match section {
        Some(section) => Some(assign_section(&state, &stored.key, &section).await?.section_key),
        None => None,
    };

    state.notify(Envelope::playlist_updated()).await;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            success: true,
            key: stored.key,
            original_name,
            size: stored.size,
            content_type: stored.content_type,
            section_key,
        }),
    ))
}

/// DELETE /api/media/{key}
pub async fn delete_media(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    state.media.delete(&key).await?;
    if let Some(section) = unassign_media(&state, &key).await? {
        debug!("Removed deleted media {} from {}", key, section);
    }
    info!("Deleted media {}", key);

    state.notify(Envelope::playlist_updated()).await;
    Ok(Json(DeleteResponse { success: true, key }))
}

/// GET /media/{key}
pub async fn get_media(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Response> {
    let metadata = state.media.metadata(&key).await?;
    let data = state.media.get(&key).await?;
    let headers = [
        (header::CONTENT_TYPE, metadata.content_type),
        (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
    ];
    Ok((headers, data).into_response())
}
