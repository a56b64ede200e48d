//! Public product listing.

use axum::{Json, extract::State, http::header::CACHE_CONTROL, response::IntoResponse};
use tracing::instrument;

use crate::error::Result;
use crate::state::AppState;

/// List active products.
///
/// GET /api/products
///
/// Served from the 60-second product cache. Browsers must not cache the
/// response so admin changes show up on the next menu load.
#[instrument(skip(state))]
pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let products = state.active_products().await?;
    tracing::info!(count = products.len(), "Returning products");

    Ok((
        [(CACHE_CONTROL, "no-store, no-cache, must-revalidate, max-age=0")],
        Json(products.as_ref().clone()),
    ))
}
