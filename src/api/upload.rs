//! Upload API endpoints
//!
//! - POST /api/v1/admin/uploads - multipart image upload, field `file`
//! - DELETE /api/v1/admin/uploads - delete by `{ "url": ... }` (URL or key)

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState};
use crate::services::UploadedImage;

/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
pub struct DeleteUploadRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteUploadResponse {
    pub key: String,
}

/// Build the upload router; bodies may be up to `max_file_size` plus framing
pub fn router(max_file_size: u64) -> Router<AppState> {
    let limit = usize::try_from(max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/", post(upload_image).delete(delete_image))
        .layer(DefaultBodyLimit::max(limit))
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::new("PAYLOAD_TOO_LARGE", e.body_text())
    } else {
        ApiError::validation_error(format!("Invalid multipart body: {}", e.body_text()))
    }
}

/// POST /api/v1/admin/uploads
async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadedImage>), ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(multipart_error)?;

        let uploaded = state
            .upload_service
            .upload_image(&filename, &content_type, data.to_vec())
            .await?;
        return Ok((StatusCode::CREATED, Json(uploaded)));
    }

    Err(ApiError::validation_error("No file provided"))
}

/// DELETE /api/v1/admin/uploads
async fn delete_image(
    State(state): State<AppState>,
    Json(body): Json<DeleteUploadRequest>,
) -> Result<Json<DeleteUploadResponse>, ApiError> {
    let key = state.upload_service.delete_image(&body.url).await?;
    Ok(Json(DeleteUploadResponse { key }))
}
