//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//! Every error body is JSON: `{"error": "<message>"}`.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use sunville_core::CheckoutError;
use thiserror::Error;

use crate::services::{MailerError, PaymentError};
use crate::stores::StoreError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request failed validation. The message is shown to the client.
    #[error("{0}")]
    Validation(String),

    /// Missing or wrong admin password.
    #[error("Unauthorized")]
    Unauthorized,

    /// Rate limited. The message is shown to the client.
    #[error("{0}")]
    RateLimited(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Payment processor call failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Email delivery failed.
    #[error("Email error: {0}")]
    Email(#[from] MailerError),

    /// File-backed store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// The storefront is in maintenance mode.
    #[error("Under maintenance")]
    Maintenance,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Payment(_) | Self::Email(_) => StatusCode::BAD_GATEWAY,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Maintenance => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Payment(_) | Self::Email(_) | Self::Storage(_) | Self::Internal(_)
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let body = match &self {
            Self::Payment(_) => json!({ "error": "Payment service error" }),
            Self::Email(_) => json!({ "error": "Failed to send email" }),
            Self::Storage(_) | Self::Internal(_) => json!({ "error": "Internal server error" }),
            Self::Maintenance => json!({ "error": "Under maintenance", "maintenanceMode": true }),
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("prod_123".to_string());
        assert_eq!(err.to_string(), "Not found: prod_123");

        let err = AppError::Validation("Name is required".to_string());
        assert_eq!(err.to_string(), "Name is required");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            AppError::Validation("x".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::RateLimited("x".to_string()).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::NotFound("x".to_string()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Payment(PaymentError::RateLimited(1)).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Internal("x".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Maintenance.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let (status, body) = body_json(AppError::Internal("db password leaked".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Internal server error" }));

        let (status, body) = body_json(AppError::Payment(PaymentError::Api {
            status: 400,
            message: "No such price: price_secret".to_string(),
        }))
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(!body.to_string().contains("price_secret"));
    }

    #[tokio::test]
    async fn test_maintenance_body() {
        let (_, body) = body_json(AppError::Maintenance).await;
        assert_eq!(
            body,
            json!({ "error": "Under maintenance", "maintenanceMode": true })
        );
    }

    #[tokio::test]
    async fn test_checkout_error_is_validation() {
        let (status, body) = body_json(CheckoutError::Empty.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Cart is empty" }));
    }
}
