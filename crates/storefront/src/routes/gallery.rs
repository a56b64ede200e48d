//! Gallery listing, admin edits and image uploads.

use axum::{
    Json,
    extract::{Multipart, State},
};
use serde::{Deserialize, Serialize};
use sunville_core::guard::{RateLimitPolicy, sanitize_filename};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::extract::ApiJson;
use crate::middleware::{ClientIp, verify_admin};
use crate::state::AppState;

/// Public URL prefix uploaded files are served under.
pub const GALLERY_URL_PREFIX: &str = "/gallery/";

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Accepted upload content types.
pub const ALLOWED_IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "image/gif",
];

/// Response for `GET /api/gallery`.
#[derive(Debug, Serialize)]
pub struct GalleryResponse {
    pub images: Vec<String>,
}

/// An add or remove, tagged by `action`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum GalleryAction {
    Add { url: String },
    Remove { url: String },
}

/// Body of `POST /api/gallery`.
#[derive(Debug, Deserialize)]
pub struct GalleryUpdate {
    #[serde(default)]
    pub password: String,
    #[serde(flatten)]
    pub action: GalleryAction,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Response for a stored upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub url: String,
    pub filename: String,
}

/// Whether `url` may be stored in the gallery: an absolute `http(s)` URL or a
/// file under `/gallery/`.
#[must_use]
pub fn is_allowed_image_url(url: &str) -> bool {
    if url.is_empty() || url.len() > 2048 || url.chars().any(|c| c.is_whitespace() || c == '"') {
        return false;
    }
    if let Some(name) = url.strip_prefix(GALLERY_URL_PREFIX) {
        return !name.is_empty() && sanitize_filename(name) == name;
    }
    url::Url::parse(url)
        .is_ok_and(|parsed| matches!(parsed.scheme(), "http" | "https") && parsed.has_host())
}

/// GET /api/gallery
pub async fn list(State(state): State<AppState>) -> Result<Json<GalleryResponse>> {
    let images = state.gallery().list().await?;
    Ok(Json(GalleryResponse { images }))
}

/// Add or remove a gallery image.
///
/// POST /api/gallery
#[instrument(skip(state, update))]
pub async fn update(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    ApiJson(update): ApiJson<GalleryUpdate>,
) -> Result<Json<SuccessResponse>> {
    verify_admin(&state, &client_ip, &update.password)?;

    match &update.action {
        GalleryAction::Add { url } => {
            if !is_allowed_image_url(url) {
                return Err(AppError::Validation("Invalid image URL".to_string()));
            }
            state.gallery().add(url).await?;
        }
        GalleryAction::Remove { url } => {
            state.gallery().remove(url).await?;
        }
    }

    Ok(Json(SuccessResponse { success: true }))
}

struct UploadedFile {
    name: String,
    content_type: String,
    bytes: Vec<u8>,
}

/// Store an uploaded gallery image.
///
/// POST /api/gallery/upload (multipart: `file`, `password`)
///
/// The file lands in the upload directory as `<epoch-ms>-<sanitized name>` and
/// is served from `/gallery/<name>`. Adding it to the gallery list is a
/// separate `POST /api/gallery`.
#[instrument(skip(state, multipart))]
pub async fn upload(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    if !state
        .limiter()
        .check_policy(&RateLimitPolicy::GALLERY_UPLOAD, &client_ip)
    {
        tracing::warn!(client_ip, "Gallery upload rate limited");
        return Err(AppError::RateLimited(
            "Too many uploads. Please try again later.".to_string(),
        ));
    }

    let mut password = String::new();
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        match field.name() {
            Some("password") => {
                password = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(e.body_text()))?;
            }
            Some("file") => {
                let name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(e.body_text()))?;
                file = Some(UploadedFile {
                    name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {}
        }
    }

    verify_admin(&state, &client_ip, &password)?;

    let file = file.ok_or_else(|| AppError::Validation("No file provided".to_string()))?;
    if !ALLOWED_IMAGE_TYPES.contains(&file.content_type.as_str()) {
        return Err(AppError::Validation(
            "Invalid file type. Only JPEG, PNG, WebP, and GIF allowed".to_string(),
        ));
    }
    if file.bytes.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::Validation(
            "File size must be less than 5MB".to_string(),
        ));
    }

    let sanitized = sanitize_filename(&file.name);
    if sanitized.is_empty() {
        return Err(AppError::Validation("Invalid file name".to_string()));
    }
    let filename = format!("{}-{sanitized}", chrono::Utc::now().timestamp_millis());

    let upload_dir = &state.config().upload_dir;
    let path = upload_dir.join(&filename);
    if path.parent() != Some(upload_dir.as_path()) {
        return Err(AppError::Validation("Invalid file path".to_string()));
    }

    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| AppError::Internal(format!("create upload dir: {e}")))?;
    tokio::fs::write(&path, &file.bytes)
        .await
        .map_err(|e| AppError::Internal(format!("write upload: {e}")))?;

    tracing::info!(filename, size = file.bytes.len(), "Gallery image uploaded");
    Ok(Json(UploadResponse {
        success: true,
        url: format!("{GALLERY_URL_PREFIX}{filename}"),
        filename,
    }))
}
