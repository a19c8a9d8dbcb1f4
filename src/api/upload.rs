//! Image upload endpoint

use axum::{
    extract::{Multipart, State},
    response::Json,
};
use serde_json::Value;

use crate::AppState;
use crate::auth::CurrentAdmin;
use crate::error::AppError;
use crate::metrics::{HTTP_REQUEST_DURATION_SECONDS, UPLOAD_BYTES_TOTAL, UPLOADS_TOTAL};
use crate::storage::MAX_UPLOAD_BYTES;

/// POST /api/upload
///
/// Accepts a single multipart file field. Only image MIME types are
/// allowed, capped at 8 MB. Returns the public URL of the stored file.
pub async fn upload(
    State(state): State<AppState>,
    CurrentAdmin(_session): CurrentAdmin,
    mut multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    // Start timing the request
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/upload"])
        .start_timer();

    let mut stored_url: Option<String> = None;

    // Parse multipart form data
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to parse multipart: {}", e)))?
    {
        // The first field carrying a file wins; stray text fields are skipped.
        let Some(original_name) = field.file_name().map(ToOwned::to_owned) else {
            continue;
        };
        if stored_url.is_some() {
            continue;
        }

        let content_type = field
            .content_type()
            .map(ToOwned::to_owned)
            .ok_or_else(|| {
                AppError::Validation("Missing content type for uploaded file".to_string())
            })?;
        if !content_type.starts_with("image/") {
            return Err(AppError::Validation(format!(
                "Unsupported media type: {}",
                content_type
            )));
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {}", e)))?
        {
            if bytes.len() + chunk.len() > MAX_UPLOAD_BYTES {
                return Err(AppError::PayloadTooLarge(format!(
                    "upload exceeds {} bytes",
                    MAX_UPLOAD_BYTES
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        let size = bytes.len();
        let url = state.uploads.store(&original_name, bytes).await?;

        UPLOADS_TOTAL.inc();
        UPLOAD_BYTES_TOTAL.inc_by(size as f64);
        stored_url = Some(url);
    }

    let url = stored_url.ok_or_else(|| AppError::Validation("missing file".to_string()))?;
    Ok(Json(serde_json::json!({ "ok": true, "url": url })))
}
