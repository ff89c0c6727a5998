//! Image uploads for post content.
//!
//! Files are validated locally (size, type, magic bytes) before anything is
//! sent to the image store.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{delete, post},
};
use serde::Serialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::services::images::{CloudinaryClient, ImageStoreError, MAX_IMAGE_BYTES, UploadedImage};
use crate::state::AppState;

/// Multipart framing on top of the largest accepted file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Debug, Serialize)]
pub struct DestroyResponse {
    pub deleted: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/admin/images",
            post(upload).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + MULTIPART_OVERHEAD)),
        )
        .route("/api/admin/images/{*public_id}", delete(destroy))
}

/// Upload the `file` field of a multipart form.
///
/// POST /api/admin/images
#[instrument(skip_all)]
pub async fn upload(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadedImage>)> {
    let client = image_store(&state)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let mime = field
            .content_type()
            .map(str::to_owned)
            .ok_or_else(|| ImageStoreError::UnsupportedType("missing content type".to_string()))?;
        let file_name = field.file_name().unwrap_or("upload").to_owned();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        let image = client.upload(bytes.to_vec(), &mime, &file_name).await?;
        tracing::info!(public_id = %image.public_id, "image uploaded");
        return Ok((StatusCode::CREATED, Json(image)));
    }

    Err(AppError::BadRequest("file field is required".to_string()))
}

/// Remove an image from the store.
///
/// DELETE /api/admin/images/{public_id}
#[instrument(skip_all, fields(public_id = %public_id))]
pub async fn destroy(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(public_id): Path<String>,
) -> Result<Json<DestroyResponse>> {
    let deleted = image_store(&state)?.destroy(&public_id).await?;
    Ok(Json(DestroyResponse { deleted }))
}

fn image_store(state: &AppState) -> Result<&CloudinaryClient> {
    state
        .images()
        .ok_or_else(|| ImageStoreError::NotConfigured.into())
}
