//! Stripe webhook receiver.
//!
//! The signature is checked against the raw body before anything is parsed.
//! A paid checkout triggers an order email to the bakery; a failed email is
//! logged and the event is still acknowledged so Stripe does not retry it.

use axum::{Json, extract::State, http::HeaderMap};
use secrecy::ExposeSecret;
use serde::Serialize;
use sunville_core::Price;
use sunville_core::guard::sanitize_pickup_time;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::services::notifications::{OrderSummary, order_email};
use crate::services::stripe::{CompletedSession, WebhookEvent, verify_webhook_signature};
use crate::state::AppState;

/// Header carrying `t=<ts>,v1=<sig>`.
pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub received: bool,
}

/// POST /api/webhooks/stripe
#[instrument(skip_all)]
pub async fn stripe(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookResponse>> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Validation("No signature found".to_string()))?;

    let secret = state.config().stripe.webhook_secret.expose_secret();
    let now = chrono::Utc::now().timestamp();
    if let Err(e) = verify_webhook_signature(secret, signature, &body, now) {
        tracing::warn!(error = %e, "Webhook signature verification failed");
        return Err(AppError::Validation(
            "Webhook signature verification failed".to_string(),
        ));
    }

    let event = WebhookEvent::parse(&body)
        .map_err(|e| AppError::Validation(format!("Invalid event payload: {e}")))?;
    tracing::info!(event_id = %event.id, event_type = %event.event_type, "Webhook received");

    let session = event
        .completed_session()
        .map_err(|e| AppError::Validation(format!("Invalid checkout session: {e}")))?;
    if let Some(session) = session {
        notify_order(&state, session).await?;
    }

    Ok(Json(WebhookResponse { received: true }))
}

async fn notify_order(state: &AppState, session: CompletedSession) -> Result<()> {
    let items = state
        .payments()
        .list_session_line_items(&session.id)
        .await?;

    let customer = session.customer_details.unwrap_or_default();
    let order = OrderSummary {
        order_id: session.id,
        customer_name: customer.name.unwrap_or_else(|| "Customer".to_string()),
        customer_email: customer
            .email
            .unwrap_or_else(|| "No email provided".to_string()),
        pickup_time: sanitize_pickup_time(session.metadata.get("pickupTime").map(String::as_str)),
        items,
        total: Price::from_cents(session.amount_total.unwrap_or(0)),
    };

    let email = order_email(&state.config().email, &order)?;
    match state.mailer().send(&email).await {
        Ok(()) => tracing::info!(order_id = %order.order_id, "Order notification sent"),
        Err(e) => {
            tracing::error!(order_id = %order.order_id, error = %e, "Failed to send order notification");
        }
    }
    Ok(())
}
