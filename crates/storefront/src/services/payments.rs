//! Payment processor contract.
//!
//! Route handlers talk to the catalog and to checkout through
//! [`PaymentProcessor`] so tests can swap in a fake. The production
//! implementation is [`super::StripeClient`].

use async_trait::async_trait;
use serde::Serialize;
use sunville_core::checkout::LineItem;
use sunville_core::{Price, PriceId, ProductId};
use thiserror::Error;

/// Placeholder image for products without one.
pub const PLACEHOLDER_IMAGE: &str = "/placeholder.svg";

/// Category for products that never had one set.
pub const DEFAULT_CATEGORY: &str = "Buns";

/// Errors that can occur when talking to the payment processor.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limited by the processor.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// A product as the storefront shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProduct {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Default price as `"3.25"`, or `"0.00"` when there is none.
    pub price: String,
    /// Default price id, or `""` when there is none.
    pub price_id: String,
    pub image: String,
    pub category: String,
    pub active: bool,
}

/// Editable product fields, shared by create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub category: String,
    /// `None` clears the image.
    pub image: Option<String>,
}

/// Input for a hosted checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionRequest {
    pub line_items: Vec<LineItem>,
    pub success_url: String,
    pub cancel_url: String,
    /// Sanitized pickup time, echoed back in the completion webhook.
    pub pickup_time: String,
    pub product_name: String,
}

/// A created checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    /// Hosted payment page the customer is redirected to.
    pub url: String,
}

/// One purchased line of a completed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLineItem {
    pub name: String,
    pub quantity: u32,
    pub unit_amount: Price,
}

impl SessionLineItem {
    /// `unit_amount × quantity`.
    #[must_use]
    pub fn total(&self) -> Price {
        Price::from_cents(self.unit_amount.to_cents() * i64::from(self.quantity))
    }
}

/// Catalog and checkout operations the storefront needs from a payment
/// processor.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// List products, optionally only the active ones.
    async fn list_products(&self, active_only: bool) -> Result<Vec<CatalogProduct>, PaymentError>;

    /// Create a hosted checkout session.
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Show or hide a product.
    async fn set_product_active(
        &self,
        product_id: &ProductId,
        active: bool,
    ) -> Result<(), PaymentError>;

    /// Create an active product without a price.
    async fn create_product(&self, draft: &ProductDraft) -> Result<ProductId, PaymentError>;

    /// Overwrite a product's editable fields.
    async fn update_product(
        &self,
        product_id: &ProductId,
        draft: &ProductDraft,
    ) -> Result<(), PaymentError>;

    /// Archive a product. Products are never hard-deleted so past orders keep
    /// resolving.
    async fn archive_product(&self, product_id: &ProductId) -> Result<(), PaymentError>;

    /// Unit amount of a price, `None` for prices without a fixed amount.
    async fn retrieve_price_amount(&self, price_id: &PriceId)
    -> Result<Option<Price>, PaymentError>;

    /// Create a USD price for a product.
    async fn create_price(
        &self,
        product_id: &ProductId,
        amount: Price,
    ) -> Result<PriceId, PaymentError>;

    /// Deactivate a price.
    async fn archive_price(&self, price_id: &PriceId) -> Result<(), PaymentError>;

    /// Make `price_id` the product's default price.
    async fn set_default_price(
        &self,
        product_id: &ProductId,
        price_id: &PriceId,
    ) -> Result<(), PaymentError>;

    /// Purchased lines of a checkout session.
    async fn list_session_line_items(
        &self,
        session_id: &str,
    ) -> Result<Vec<SessionLineItem>, PaymentError>;
}

/// Replace a product's price: archive the old one (if any), create the new
/// one and make it the default. Returns the new price id.
///
/// # Errors
///
/// Returns the first processor error; earlier steps are not rolled back.
pub async fn replace_price(
    payments: &dyn PaymentProcessor,
    product_id: &ProductId,
    old_price_id: Option<&PriceId>,
    amount: Price,
) -> Result<PriceId, PaymentError> {
    if let Some(old) = old_price_id {
        payments.archive_price(old).await?;
    }
    let new_price_id = payments.create_price(product_id, amount).await?;
    payments.set_default_price(product_id, &new_price_id).await?;
    Ok(new_price_id)
}
