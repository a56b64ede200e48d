//! Integration tests for `POST /api/webhooks/stripe`.

use axum::{
    body::Body,
    http::{Request, StatusCode, header::CONTENT_TYPE},
};
use serde_json::json;
use sunville_core::Price;
use sunville_integration_tests::{TestContext, TestResponse, WEBHOOK_SECRET};
use sunville_storefront::services::SessionLineItem;
use sunville_storefront::services::stripe::sign_payload;

fn completed_event(pickup_time: &str) -> String {
    json!({
        "id": "evt_1",
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": "cs_test_42",
                "object": "checkout.session",
                "amount_total": 1100,
                "customer_details": { "email": "ana@example.com", "name": "Ana" },
                "metadata": { "pickupTime": pickup_time, "productName": "Cart items" }
            }
        }
    })
    .to_string()
}

async fn deliver(ctx: &TestContext, payload: &str, signature: Option<String>) -> TestResponse {
    let mut request = Request::builder()
        .method("POST")
        .uri("/api/webhooks/stripe")
        .header(CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        request = request.header("stripe-signature", signature);
    }
    ctx.send(
        request
            .body(Body::from(payload.to_string()))
            .expect("build request"),
    )
    .await
}

fn sign(payload: &str, timestamp: i64) -> String {
    let ts = timestamp.to_string();
    let sig = sign_payload(WEBHOOK_SECRET, &ts, payload).expect("sign payload");
    format!("t={ts},v1={sig}")
}

fn line_items() -> Vec<SessionLineItem> {
    vec![
        SessionLineItem {
            name: "Ube Cheese Bun".to_string(),
            quantity: 2,
            unit_amount: Price::from_cents(325),
        },
        SessionLineItem {
            name: "Pandesal".to_string(),
            quantity: 1,
            unit_amount: Price::from_cents(450),
        },
    ]
}

// =============================================================================
// Signature verification
// =============================================================================

#[tokio::test]
async fn test_missing_signature() {
    let ctx = TestContext::new();

    let response = deliver(&ctx, &completed_event("ASAP"), None).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body, json!({ "error": "No signature found" }));
    assert!(ctx.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_bad_or_stale_signature() {
    let ctx = TestContext::new();
    let payload = completed_event("ASAP");
    let now = chrono::Utc::now().timestamp();

    let tampered = payload.replace("1100", "1");
    let response = deliver(&ctx, &tampered, Some(sign(&payload, now))).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = deliver(&ctx, &payload, Some(sign(&payload, now - 600))).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = deliver(&ctx, &payload, Some("t=abc,v1=00".to_string())).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    assert!(ctx.mailer.sent().is_empty());
}

// =============================================================================
// Order notification
// =============================================================================

#[tokio::test]
async fn test_completed_checkout_emails_order() {
    let ctx = TestContext::new();
    ctx.payments.set_line_items(line_items());
    let payload = completed_event("2025-03-01 at 02:00 PM");

    let response = deliver(
        &ctx,
        &payload,
        Some(sign(&payload, chrono::Utc::now().timestamp())),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({ "received": true }));

    let sent = ctx.mailer.sent();
    assert_eq!(sent.len(), 1);
    let email = &sent[0];
    assert_eq!(
        email.subject,
        "New Order: $11.00 - Pickup 2025-03-01 at 02:00 PM"
    );
    assert!(email.html.contains("Ube Cheese Bun"));
    assert!(email.html.contains("$6.50"));
    assert!(email.html.contains("cs_test_42"));
    assert!(email.html.contains("Ana"));
    assert!(
        ctx.payments
            .calls()
            .contains(&"list_session_line_items cs_test_42".to_string())
    );
}

#[tokio::test]
async fn test_injected_pickup_time_is_sanitized() {
    let ctx = TestContext::new();
    let payload = completed_event("<img src=x onerror=alert(1)>");

    let response = deliver(
        &ctx,
        &payload,
        Some(sign(&payload, chrono::Utc::now().timestamp())),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    let email = &ctx.mailer.sent()[0];
    assert!(email.subject.ends_with("Pickup ASAP"));
    assert!(!email.html.contains("onerror"));
}

#[tokio::test]
async fn test_email_failure_still_acknowledged() {
    let ctx = TestContext::new();
    ctx.mailer.fail(true);
    let payload = completed_event("ASAP");

    let response = deliver(
        &ctx,
        &payload,
        Some(sign(&payload, chrono::Utc::now().timestamp())),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({ "received": true }));
}

#[tokio::test]
async fn test_other_events_are_acknowledged() {
    let ctx = TestContext::new();
    let payload = json!({
        "id": "evt_2",
        "type": "payment_intent.created",
        "data": { "object": { "id": "pi_1" } }
    })
    .to_string();

    let response = deliver(
        &ctx,
        &payload,
        Some(sign(&payload, chrono::Utc::now().timestamp())),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(ctx.mailer.sent().is_empty());
    assert!(ctx.payments.calls().is_empty());
}
