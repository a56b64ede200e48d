//! Request extractors.

use axum::extract::FromRequest;

use crate::error::AppError;

/// `Json` extractor whose rejection is an [`AppError`], so malformed bodies get
/// the same `{"error": ...}` shape as every other failure.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);
