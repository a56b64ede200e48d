//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Health check
//!
//! # Public
//! GET  /api/products               - Active products (cached)
//! GET  /api/store-status           - Open/closed status and pickup slots
//! POST /api/checkout               - Create a checkout session
//! POST /api/contact                - Contact form
//! GET  /api/gallery                - Gallery image list
//! GET  /gallery/{file}             - Uploaded gallery files
//!
//! # Webhooks
//! POST /api/webhooks/stripe        - Stripe events (signature verified)
//!
//! # Admin (password in body)
//! POST /api/admin/verify           - Check password
//! POST /api/admin/products/list    - All products incl. inactive
//! POST /api/admin/products/toggle  - Activate / deactivate
//! POST /api/admin/products/price   - Replace price
//! POST /api/admin/products         - Create product
//! PUT  /api/admin/products         - Update product
//! DELETE /api/admin/products       - Archive product
//! GET  /api/admin/maintenance      - Maintenance status
//! POST /api/admin/maintenance      - Set maintenance mode
//! POST /api/gallery                - Add / remove gallery image
//! POST /api/gallery/upload         - Upload gallery image (multipart)
//! ```

pub mod admin;
pub mod checkout;
pub mod contact;
pub mod gallery;
pub mod health;
pub mod products;
pub mod store_status;
pub mod webhooks;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::state::AppState;

/// Multipart overhead allowed on top of the file itself.
const UPLOAD_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/verify", post(admin::verify))
        .route("/products/list", post(admin::list_products))
        .route("/products/toggle", post(admin::toggle_product))
        .route("/products/price", post(admin::update_price))
        .route(
            "/products",
            post(admin::create_product)
                .put(admin::update_product)
                .delete(admin::delete_product),
        )
        .route(
            "/maintenance",
            get(admin::maintenance_status).post(admin::set_maintenance),
        )
}

/// Create the gallery routes router.
pub fn gallery_routes() -> Router<AppState> {
    Router::new()
        .route("/api/gallery", get(gallery::list).post(gallery::update))
        .route(
            "/api/gallery/upload",
            post(gallery::upload).layer(DefaultBodyLimit::max(
                gallery::MAX_UPLOAD_BYTES + UPLOAD_OVERHEAD_BYTES,
            )),
        )
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/products", get(products::list))
        .route("/api/store-status", get(store_status::show))
        .route("/api/checkout", post(checkout::create))
        .route("/api/contact", post(contact::submit))
        .merge(gallery_routes())
        .route("/api/webhooks/stripe", post(webhooks::stripe))
        .nest("/api/admin", admin_routes())
}
