//! Upload API endpoints
//!
//! - POST /api/upload/image - Upload an article image (admin)
//! - POST /api/upload/video - Upload an article video (admin)
//!
//! Both accept multipart/form-data with a single file field named "file".

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    response::IntoResponse,
    routing::post,
    Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::ok;
use crate::services::MediaKind;

/// Multipart framing allowance on top of the largest accepted file
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Build the upload router
pub fn admin_router(max_upload_size: u64) -> Router<AppState> {
    let limit = usize::try_from(max_upload_size.saturating_add(MULTIPART_OVERHEAD))
        .unwrap_or(usize::MAX);

    Router::new()
        .route("/upload/image", post(upload_image))
        .route("/upload/video", post(upload_video))
        .layer(DefaultBodyLimit::max(limit))
}

/// POST /api/upload/image
async fn upload_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    upload(state, MediaKind::Image, multipart).await
}

/// POST /api/upload/video
async fn upload_video(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    upload(state, MediaKind::Video, multipart).await
}

async fn upload(
    state: AppState,
    kind: MediaKind,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let mut multipart = multipart
        .map_err(|e| ApiError::validation_error(format!("Invalid upload: {}", e.body_text())))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation_error(format!("Failed to read multipart: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().map(|s| s.to_string());
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        // Reject on type before buffering the body
        state.media.validate(kind, &content_type, 1)?;

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::validation_error(format!("Failed to read file: {}", e)))?;

        let stored = state
            .media
            .save(kind, filename.as_deref(), &content_type, &data)
            .await?;
        return Ok(ok(stored));
    }

    Err(ApiError::validation_error("No file provided"))
}
