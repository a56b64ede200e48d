//! Sunville Bakery storefront library.
//!
//! JSON API behind the bakery website: the menu, pickup slots, checkout,
//! the contact form, the gallery and the password-protected admin endpoints.
//! The binary in `main.rs` wires real Stripe and Resend clients into
//! [`app`]; tests wire fakes.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod stores;

use axum::{Router, http::Request, middleware as axum_middleware};
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir, trace::TraceLayer};

use crate::state::AppState;

/// Hard cap on any request body; the upload route is the largest consumer.
pub const MAX_REQUEST_BYTES: usize = 6 * 1024 * 1024;

/// Build the full application router with its middleware stack.
///
/// Sentry layers are included; they are inert when Sentry is not initialized.
pub fn app(state: AppState) -> Router {
    let upload_dir = state.config().upload_dir.clone();

    Router::new()
        .merge(routes::routes())
        .nest_service("/gallery", ServeDir::new(upload_dir))
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BYTES))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::maintenance_middleware,
        ))
        .layer(axum_middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(axum_middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
