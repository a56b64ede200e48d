//! Admin endpoints: password check, product management, maintenance mode.
//!
//! Every request carries the admin password in its JSON body and goes through
//! [`verify_admin`], which also enforces the failed-attempt limit.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use sunville_core::{Price, PriceId, ProductId};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::extract::ApiJson;
use crate::middleware::{ClientIp, verify_admin};
use crate::services::payments::{DEFAULT_CATEGORY, PLACEHOLDER_IMAGE, replace_price};
use crate::services::{CatalogProduct, ProductDraft};
use crate::state::AppState;

// =============================================================================
// Request / response types
// =============================================================================

/// Body carrying only the admin password.
#[derive(Debug, Deserialize)]
pub struct PasswordRequest {
    #[serde(default)]
    pub password: String,
}

/// A price as sent by the admin UI: `"3.25"` or `3.25`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Text(String),
    Number(serde_json::Number),
}

impl PriceInput {
    /// Parse into a positive [`Price`].
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error for malformed, negative or zero amounts.
    pub fn parse(&self) -> Result<Price> {
        let raw = match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
        };
        let price = Price::parse(&raw)
            .map_err(|e| AppError::Validation(format!("Invalid price: {e}")))?;
        if price.to_cents() == 0 {
            return Err(AppError::Validation(
                "Price must be greater than zero".to_string(),
            ));
        }
        Ok(price)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRequest {
    #[serde(default)]
    pub password: String,
    pub product_id: ProductId,
    pub active: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRequest {
    #[serde(default)]
    pub password: String,
    pub product_id: ProductId,
    #[serde(default)]
    pub price_id: Option<String>,
    pub price: PriceInput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: PriceInput,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[serde(default)]
    pub password: String,
    pub product_id: ProductId,
    #[serde(default)]
    pub price_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: PriceInput,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteProductRequest {
    #[serde(default)]
    pub password: String,
    pub product_id: ProductId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceRequest {
    #[serde(default)]
    pub password: String,
    pub maintenance_mode: bool,
}

#[derive(Debug, Serialize)]
pub struct ProductsResponse {
    pub products: Vec<CatalogProduct>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceResponse {
    pub success: bool,
    pub message: String,
    pub new_price_id: PriceId,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub success: bool,
    pub product: CatalogProduct,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceStatus {
    pub maintenance_mode: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceUpdated {
    pub success: bool,
    pub maintenance_mode: bool,
}

// =============================================================================
// Helpers
// =============================================================================

/// Treat a missing or blank optional price id as absent.
fn optional_price_id(raw: Option<&str>) -> Result<Option<PriceId>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(id) => PriceId::parse(id)
            .map(Some)
            .map_err(|e| AppError::Validation(format!("Invalid price ID: {e}"))),
    }
}

fn draft(
    name: &str,
    description: Option<&str>,
    category: Option<&str>,
    image: Option<&str>,
) -> Result<ProductDraft> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Name and price are required".to_string()));
    }
    let category = category
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_CATEGORY);
    let image = image.map(str::trim).filter(|i| !i.is_empty());

    Ok(ProductDraft {
        name: name.to_string(),
        description: description.unwrap_or_default().trim().to_string(),
        category: category.to_string(),
        image: image.map(str::to_string),
    })
}

fn catalog_entry(
    id: &ProductId,
    draft: ProductDraft,
    price: Price,
    price_id: &PriceId,
    active: bool,
) -> CatalogProduct {
    CatalogProduct {
        id: id.to_string(),
        name: draft.name,
        description: draft.description,
        price: price.to_amount_string(),
        price_id: price_id.to_string(),
        image: draft.image.unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
        category: draft.category,
        active,
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Check the admin password.
///
/// POST /api/admin/verify
///
/// Responds `{success: true}`, or 401 `{success: false}` for a wrong password.
#[instrument(skip(state, body))]
pub async fn verify(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    ApiJson(body): ApiJson<PasswordRequest>,
) -> Result<Response> {
    match verify_admin(&state, &client_ip, &body.password) {
        Ok(()) => Ok(Json(serde_json::json!({ "success": true })).into_response()),
        Err(AppError::Unauthorized) => Ok((
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "success": false })),
        )
            .into_response()),
        Err(e) => Err(e),
    }
}

/// List every product, including inactive ones.
///
/// POST /api/admin/products/list
#[instrument(skip(state, body))]
pub async fn list_products(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    ApiJson(body): ApiJson<PasswordRequest>,
) -> Result<Json<ProductsResponse>> {
    verify_admin(&state, &client_ip, &body.password)?;
    let products = state.payments().list_products(false).await?;
    Ok(Json(ProductsResponse { products }))
}

/// Show or hide a product.
///
/// POST /api/admin/products/toggle
#[instrument(skip(state, body), fields(product_id = %body.product_id))]
pub async fn toggle_product(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    ApiJson(body): ApiJson<ToggleRequest>,
) -> Result<Json<MessageResponse>> {
    verify_admin(&state, &client_ip, &body.password)?;
    state
        .payments()
        .set_product_active(&body.product_id, body.active)
        .await?;
    state.invalidate_products().await;

    let verb = if body.active { "activated" } else { "deactivated" };
    tracing::info!(active = body.active, "Product toggled");
    Ok(Json(MessageResponse {
        success: true,
        message: format!("Product {verb} successfully"),
    }))
}

/// Replace a product's price.
///
/// POST /api/admin/products/price
#[instrument(skip(state, body), fields(product_id = %body.product_id))]
pub async fn update_price(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    ApiJson(body): ApiJson<PriceRequest>,
) -> Result<Json<PriceResponse>> {
    verify_admin(&state, &client_ip, &body.password)?;
    let amount = body.price.parse()?;
    let old_price_id = optional_price_id(body.price_id.as_deref())?;

    let new_price_id = replace_price(
        state.payments(),
        &body.product_id,
        old_price_id.as_ref(),
        amount,
    )
    .await?;
    state.invalidate_products().await;

    tracing::info!(%new_price_id, %amount, "Price updated");
    Ok(Json(PriceResponse {
        success: true,
        message: "Price updated successfully".to_string(),
        new_price_id,
    }))
}

/// Create a product with a default price.
///
/// POST /api/admin/products
#[instrument(skip(state, body))]
pub async fn create_product(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    ApiJson(body): ApiJson<CreateProductRequest>,
) -> Result<Json<ProductResponse>> {
    verify_admin(&state, &client_ip, &body.password)?;
    let draft = draft(
        &body.name,
        body.description.as_deref(),
        body.category.as_deref(),
        body.image.as_deref(),
    )?;
    let amount = body.price.parse()?;

    let payments = state.payments();
    let product_id = payments.create_product(&draft).await?;
    let price_id = payments.create_price(&product_id, amount).await?;
    payments.set_default_price(&product_id, &price_id).await?;
    state.invalidate_products().await;

    tracing::info!(%product_id, "Product created");
    Ok(Json(ProductResponse {
        success: true,
        product: catalog_entry(&product_id, draft, amount, &price_id, true),
    }))
}

/// Update a product. A new price is created only when the amount changed.
///
/// PUT /api/admin/products
#[instrument(skip(state, body), fields(product_id = %body.product_id))]
pub async fn update_product(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    ApiJson(body): ApiJson<UpdateProductRequest>,
) -> Result<Json<ProductResponse>> {
    verify_admin(&state, &client_ip, &body.password)?;
    let draft = draft(
        &body.name,
        body.description.as_deref(),
        body.category.as_deref(),
        body.image.as_deref(),
    )?;
    let amount = body.price.parse()?;
    let current_price_id = optional_price_id(body.price_id.as_deref())?;

    let payments = state.payments();
    payments.update_product(&body.product_id, &draft).await?;

    let current_amount = match &current_price_id {
        Some(price_id) => payments.retrieve_price_amount(price_id).await?,
        None => None,
    };
    let price_id = match current_price_id {
        Some(price_id) if current_amount == Some(amount) => price_id,
        old => {
            replace_price(payments, &body.product_id, old.as_ref(), amount).await?
        }
    };
    state.invalidate_products().await;

    tracing::info!(%price_id, "Product updated");
    Ok(Json(ProductResponse {
        success: true,
        product: catalog_entry(&body.product_id, draft, amount, &price_id, true),
    }))
}

/// Archive a product.
///
/// DELETE /api/admin/products
#[instrument(skip(state, body), fields(product_id = %body.product_id))]
pub async fn delete_product(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    ApiJson(body): ApiJson<DeleteProductRequest>,
) -> Result<Json<MessageResponse>> {
    verify_admin(&state, &client_ip, &body.password)?;
    state.payments().archive_product(&body.product_id).await?;
    state.invalidate_products().await;

    tracing::info!("Product archived");
    Ok(Json(MessageResponse {
        success: true,
        message: "Product deleted successfully".to_string(),
    }))
}

/// GET /api/admin/maintenance
pub async fn maintenance_status(State(state): State<AppState>) -> Json<MaintenanceStatus> {
    Json(MaintenanceStatus {
        maintenance_mode: state.maintenance().is_enabled(),
    })
}

/// Turn maintenance mode on or off.
///
/// POST /api/admin/maintenance
#[instrument(skip(state, body), fields(enabled = body.maintenance_mode))]
pub async fn set_maintenance(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    ApiJson(body): ApiJson<MaintenanceRequest>,
) -> Result<Json<MaintenanceUpdated>> {
    verify_admin(&state, &client_ip, &body.password)?;
    state.maintenance().set(body.maintenance_mode).await?;
    Ok(Json(MaintenanceUpdated {
        success: true,
        maintenance_mode: body.maintenance_mode,
    }))
}
