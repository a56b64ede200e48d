//! Integration tests for the admin endpoints and their password guard.

use axum::http::StatusCode;
use serde_json::json;
use sunville_integration_tests::{ADMIN_PASSWORD, TestContext};

// =============================================================================
// Password verification and brute-force protection
// =============================================================================

#[tokio::test]
async fn test_verify_password() {
    let ctx = TestContext::new();

    let response = ctx
        .post("/api/admin/verify", "203.0.113.30", &json!({ "password": ADMIN_PASSWORD }))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({ "success": true }));

    let response = ctx
        .post("/api/admin/verify", "203.0.113.30", &json!({ "password": "guess" }))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body, json!({ "success": false }));
}

#[tokio::test]
async fn test_failed_attempts_lock_out_even_correct_password() {
    let ctx = TestContext::new();
    let ip = "198.51.100.30";

    for _ in 0..5 {
        let response = ctx
            .post("/api/admin/verify", ip, &json!({ "password": "wrong" }))
            .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }

    let response = ctx
        .post("/api/admin/verify", ip, &json!({ "password": ADMIN_PASSWORD }))
        .await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);

    // The lockout covers every admin endpoint for that client.
    let response = ctx
        .post("/api/admin/products/list", ip, &json!({ "password": ADMIN_PASSWORD }))
        .await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);

    // Other clients are unaffected.
    let response = ctx
        .post(
            "/api/admin/verify",
            "198.51.100.31",
            &json!({ "password": ADMIN_PASSWORD }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_successful_logins_do_not_count() {
    let ctx = TestContext::new();

    for _ in 0..10 {
        let response = ctx
            .post(
                "/api/admin/verify",
                "198.51.100.32",
                &json!({ "password": ADMIN_PASSWORD }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_mutations_require_password() {
    let ctx = TestContext::new();
    ctx.payments
        .add_product("prod_ube", "Ube Bun", "price_ube", "3.25", true);

    let response = ctx
        .post(
            "/api/admin/products/toggle",
            "203.0.113.31",
            &json!({ "productId": "prod_ube", "active": false, "password": "nope" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body, json!({ "error": "Unauthorized" }));
    assert!(ctx.payments.calls().is_empty());
}

// =============================================================================
// Products
// =============================================================================

#[tokio::test]
async fn test_list_includes_inactive() {
    let ctx = TestContext::new();
    ctx.payments
        .add_product("prod_ube", "Ube Bun", "price_ube", "3.25", true);
    ctx.payments
        .add_product("prod_old", "Old Bun", "price_old", "2.00", false);

    let response = ctx
        .post(
            "/api/admin/products/list",
            "203.0.113.32",
            &json!({ "password": ADMIN_PASSWORD }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let products = response.body["products"].as_array().expect("products array");
    assert_eq!(products.len(), 2);
    assert_eq!(products[1]["active"], json!(false));
}

#[tokio::test]
async fn test_toggle_invalidates_public_cache() {
    let ctx = TestContext::new();
    ctx.payments
        .add_product("prod_ube", "Ube Bun", "price_ube", "3.25", true);

    let response = ctx.get("/api/products").await;
    assert_eq!(response.body.as_array().expect("array").len(), 1);

    let response = ctx
        .post(
            "/api/admin/products/toggle",
            "203.0.113.33",
            &json!({ "productId": "prod_ube", "active": false, "password": ADMIN_PASSWORD }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Product deactivated successfully");

    let response = ctx.get("/api/products").await;
    assert!(response.body.as_array().expect("array").is_empty());
}

#[tokio::test]
async fn test_replace_price() {
    let ctx = TestContext::new();
    ctx.payments
        .add_product("prod_ube", "Ube Bun", "price_ube", "3.25", true);

    let response = ctx
        .post(
            "/api/admin/products/price",
            "203.0.113.34",
            &json!({
                "productId": "prod_ube",
                "priceId": "price_ube",
                "price": "3.50",
                "password": ADMIN_PASSWORD
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let new_price_id = response.body["newPriceId"].as_str().expect("newPriceId");
    assert!(new_price_id.starts_with("price_"));
    assert_eq!(
        ctx.payments.calls(),
        vec![
            "archive_price price_ube".to_string(),
            "create_price prod_ube 350".to_string(),
            format!("set_default_price prod_ube {new_price_id}"),
        ]
    );
    assert_eq!(
        ctx.payments.product("prod_ube").expect("product").price,
        "3.50"
    );
}

#[tokio::test]
async fn test_create_product() {
    let ctx = TestContext::new();

    let response = ctx
        .post(
            "/api/admin/products",
            "203.0.113.35",
            &json!({ "name": "Pandesal", "price": "1.25", "password": ADMIN_PASSWORD }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let product = &response.body["product"];
    assert_eq!(product["name"], "Pandesal");
    assert_eq!(product["price"], "1.25");
    assert_eq!(product["category"], "Buns");
    assert_eq!(product["image"], "/placeholder.svg");
    assert!(product["priceId"].as_str().expect("priceId").starts_with("price_"));
}

#[tokio::test]
async fn test_create_requires_name_and_valid_price() {
    let ctx = TestContext::new();

    for body in [
        json!({ "name": "", "price": "1.25", "password": ADMIN_PASSWORD }),
        json!({ "name": "Pandesal", "price": "cheap", "password": ADMIN_PASSWORD }),
        json!({ "name": "Pandesal", "price": "-1", "password": ADMIN_PASSWORD }),
    ] {
        let response = ctx.post("/api/admin/products", "203.0.113.36", &body).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "body: {body}");
    }
    assert!(ctx.payments.calls().is_empty());
}

#[tokio::test]
async fn test_update_keeps_price_when_unchanged() {
    let ctx = TestContext::new();
    ctx.payments
        .add_product("prod_ube", "Ube Bun", "price_ube", "3.25", true);

    let response = ctx
        .json(
            "PUT",
            "/api/admin/products",
            "203.0.113.37",
            &json!({
                "productId": "prod_ube",
                "priceId": "price_ube",
                "name": "Ube Cheese Bun",
                "price": "3.25",
                "password": ADMIN_PASSWORD
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["product"]["priceId"], "price_ube");
    assert_eq!(ctx.payments.calls(), vec!["update_product prod_ube".to_string()]);
}

#[tokio::test]
async fn test_update_reprices_when_changed() {
    let ctx = TestContext::new();
    ctx.payments
        .add_product("prod_ube", "Ube Bun", "price_ube", "3.25", true);

    let response = ctx
        .json(
            "PUT",
            "/api/admin/products",
            "203.0.113.38",
            &json!({
                "productId": "prod_ube",
                "priceId": "price_ube",
                "name": "Ube Bun",
                "price": 4,
                "password": ADMIN_PASSWORD
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_ne!(response.body["product"]["priceId"], "price_ube");
    assert_eq!(response.body["product"]["price"], "4.00");
    assert!(
        ctx.payments
            .calls()
            .contains(&"archive_price price_ube".to_string())
    );
}

#[tokio::test]
async fn test_delete_archives() {
    let ctx = TestContext::new();
    ctx.payments
        .add_product("prod_ube", "Ube Bun", "price_ube", "3.25", true);

    let response = ctx
        .json(
            "DELETE",
            "/api/admin/products",
            "203.0.113.39",
            &json!({ "productId": "prod_ube", "password": ADMIN_PASSWORD }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(!ctx.payments.product("prod_ube").expect("product").active);
}
