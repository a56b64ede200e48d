//! Checkout session creation.

use axum::{Json, extract::State};
use serde::Serialize;
use sunville_core::guard::RateLimitPolicy;
use sunville_core::{CheckoutRequest, PickupSelection};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::extract::ApiJson;
use crate::middleware::ClientIp;
use crate::services::CheckoutSessionRequest;
use crate::state::AppState;

/// Shown in the order notification when a cart (not a single product) is bought.
const CART_PRODUCT_NAME: &str = "Cart items";

/// Response for `POST /api/checkout`.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    /// Hosted payment page.
    pub url: String,
}

/// Create a checkout session.
///
/// POST /api/checkout
///
/// Accepts either a cart (`{items, pickupTime}`) or a single product
/// (`{priceId, productName, pickupTime}`).
#[instrument(skip(state, request))]
pub async fn create(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    ApiJson(request): ApiJson<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    if !state
        .limiter()
        .check_policy(&RateLimitPolicy::CHECKOUT, &client_ip)
    {
        tracing::warn!(client_ip, "Checkout rate limited");
        return Err(AppError::RateLimited(
            "Too many checkout attempts. Please try again later.".to_string(),
        ));
    }

    let checkout = request.validate()?;

    // Shape-valid but impossible values such as "13:00 PM" fail to parse.
    let slot_available = match PickupSelection::parse(&checkout.pickup_time) {
        Ok(PickupSelection::Immediate) => true,
        Ok(pickup) => pickup.is_valid_at(state.config().local_now()),
        Err(_) => false,
    };
    if !slot_available {
        return Err(AppError::Validation(
            "Selected pickup time is no longer available".to_string(),
        ));
    }

    let base_url = &state.config().base_url;
    let session = state
        .payments()
        .create_checkout_session(&CheckoutSessionRequest {
            line_items: checkout.line_items,
            success_url: format!("{base_url}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}"),
            cancel_url: format!("{base_url}/menu"),
            pickup_time: checkout.pickup_time,
            product_name: checkout
                .product_name
                .unwrap_or_else(|| CART_PRODUCT_NAME.to_string()),
        })
        .await?;

    tracing::info!(session_id = %session.id, "Checkout session created");
    Ok(Json(CheckoutResponse { url: session.url }))
}
