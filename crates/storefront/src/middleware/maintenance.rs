//! Maintenance-mode gate.
//!
//! While the flag is on, public traffic gets a 503. Health checks, admin
//! endpoints, webhooks and admin gallery writes always pass so the bakery can
//! keep working on the site and Stripe can keep delivering events.

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AppError;
use crate::state::AppState;

/// Whether a request bypasses maintenance mode.
#[must_use]
pub fn is_exempt(method: &Method, path: &str) -> bool {
    if path == "/health" || path.starts_with("/api/admin/") || path.starts_with("/api/webhooks/")
    {
        return true;
    }
    method == Method::POST && matches!(path, "/api/gallery" | "/api/gallery/upload")
}

/// Reject non-exempt requests with 503 while maintenance mode is on.
pub async fn maintenance_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if state.maintenance().is_enabled() && !is_exempt(request.method(), request.uri().path()) {
        tracing::debug!(path = %request.uri().path(), "Blocked by maintenance mode");
        return AppError::Maintenance.into_response();
    }
    next.run(request).await
}
