use axum::{Json, extract::State};
use uuid::Uuid;

use super::AppJson;
use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{PresignedUploadRequest, PresignedUploadResponse, UploadKind},
};

/// Object key for an upload: `<prefix>/<uuid>.<ext>`, extension taken from the filename.
pub fn upload_key(kind: UploadKind, filename: &str) -> String {
    let extension = std::path::Path::new(filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "bin".to_string());
    format!("{}/{}.{}", kind.prefix(), Uuid::new_v4(), extension)
}

/// get_presigned_url
///
/// [Authenticated Route] Issues a short-lived URL for uploading a book cover or a photo
/// straight to object storage. The returned `resource_key` is what the book, author or
/// account form then submits as `cover` / `photo`.
///
/// Only `image/*` content types are accepted.
#[utoipa::path(
    post,
    path = "/uploads/presigned",
    request_body = PresignedUploadRequest,
    responses(
        (status = 200, description = "URL", body = PresignedUploadResponse),
        (status = 400, description = "Not an image", body = crate::error::ErrorPage)
    )
)]
pub async fn get_presigned_url(
    actor: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<PresignedUploadRequest>,
) -> AppResult<Json<PresignedUploadResponse>> {
    if !payload.content_type.starts_with("image/") {
        return Err(AppError::BadRequest(format!(
            "unsupported content type {}",
            payload.content_type
        )));
    }

    let object_key = upload_key(payload.kind, &payload.filename);
    let upload_url = state
        .storage
        .get_presigned_upload_url(&object_key, &payload.content_type)
        .await
        .map_err(|e| AppError::Internal(format!("storage error: {}", e)))?;
    tracing::info!(actor_id = actor.id, key = %object_key, "presigned upload issued");

    Ok(Json(PresignedUploadResponse {
        upload_url,
        resource_key: object_key,
    }))
}
