//! Menu import from the spreadsheet export.
//!
//! The bakery keeps its menu in a spreadsheet. This command reads the CSV
//! export and makes the Stripe catalog match it: rows are matched to existing
//! products by full name, matches are updated (and re-priced only when the
//! amount changed) and everything else is created with a default price.
//!
//! # CSV columns
//!
//! `Category`, `Name (Enlgish)` (spelled as the sheet exports it; `Name
//! (English)` is accepted too), `Name (Chinese)`, `Price`, `Image URL`.
//!
//! # Environment Variables
//!
//! - `STRIPE_SECRET_KEY` - Stripe secret API key

use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use sunville_core::{IdError, Price, PriceId, ProductId};
use sunville_storefront::config::{ConfigError, stripe_secret_key_from_env};
use sunville_storefront::services::payments::{
    DEFAULT_CATEGORY, PLACEHOLDER_IMAGE, replace_price,
};
use sunville_storefront::services::{
    CatalogProduct, PaymentError, PaymentProcessor, ProductDraft, StripeClient,
};
use thiserror::Error;
use tracing::{error, info, warn};

/// Timeout for fetching an image share page.
const IMAGE_TIMEOUT: Duration = Duration::from_secs(10);

static OG_IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"property="og:image"\s+content="([^"]+)""#).expect("Invalid regex")
});

/// Errors that can occur during an import.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Could not read the CSV file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stripe key missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// One or more rows failed validation. Nothing was imported.
    #[error("{} invalid menu rows", .0.len())]
    InvalidRows(Vec<String>),

    /// Payment processor call failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// The processor returned an id in an unexpected format.
    #[error("Invalid id from processor: {0}")]
    Id(#[from] IdError),

    /// An image share link could not be turned into a direct URL.
    #[error("Could not resolve image {url}: {reason}")]
    Image { url: String, reason: String },
}

/// Flags for [`run`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Parse and validate only.
    pub dry_run: bool,
    /// Skip share-link resolution and use image URLs as written.
    pub direct_images: bool,
}

/// Counts reported at the end of an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
    /// Updated products whose price changed.
    pub repriced: usize,
    pub failed: usize,
}

// =============================================================================
// CSV
// =============================================================================

#[derive(Debug, Deserialize)]
struct MenuRow {
    #[serde(rename = "Category", default)]
    category: String,
    #[serde(rename = "Name (Enlgish)", alias = "Name (English)")]
    english_name: String,
    #[serde(rename = "Name (Chinese)", default)]
    chinese_name: String,
    #[serde(rename = "Price")]
    price: String,
    #[serde(rename = "Image URL", default)]
    image_url: String,
}

/// A validated menu row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    /// `"<English> <Chinese>"`, the name customers see.
    pub name: String,
    pub english_name: String,
    pub category: String,
    pub price: Price,
    pub image_url: Option<String>,
}

impl MenuItem {
    fn from_row(row: MenuRow) -> Result<Self, String> {
        let english_name = row.english_name.trim().to_string();
        if english_name.is_empty() {
            return Err("name is required".to_string());
        }

        let price_text = row.price.trim();
        let price = Price::parse(price_text.strip_prefix('$').unwrap_or(price_text))
            .map_err(|e| format!("price '{price_text}': {e}"))?;
        if price == Price::ZERO {
            return Err("price must be greater than zero".to_string());
        }

        let chinese_name = row.chinese_name.trim();
        let name = if chinese_name.is_empty() {
            english_name.clone()
        } else {
            format!("{english_name} {chinese_name}")
        };
        let category = match row.category.trim() {
            "" => DEFAULT_CATEGORY.to_string(),
            category => category.to_string(),
        };
        let image_url = Some(row.image_url.trim().to_string()).filter(|url| !url.is_empty());

        Ok(Self {
            name,
            english_name,
            category,
            price,
            image_url,
        })
    }

    /// Product fields for this row with an already-resolved image.
    #[must_use]
    pub fn draft(&self, image: Option<String>) -> ProductDraft {
        ProductDraft {
            name: self.name.clone(),
            description: format!(
                "Freshly baked {} made daily with traditional techniques",
                self.english_name.to_lowercase()
            ),
            category: self.category.clone(),
            image,
        }
    }
}

/// Parse and validate every row of a menu CSV.
///
/// All rows are checked before anything is returned so a bad sheet never
/// half-imports.
///
/// # Errors
///
/// Returns `InvalidRows` listing every bad row (1-based, header excluded).
pub fn read_menu<R: Read>(reader: R) -> Result<Vec<MenuItem>, ImportError> {
    let mut csv = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut items = Vec::new();
    let mut problems = Vec::new();
    for (i, row) in csv.deserialize::<MenuRow>().enumerate() {
        let parsed = row
            .map_err(|e| e.to_string())
            .and_then(MenuItem::from_row);
        match parsed {
            Ok(item) => items.push(item),
            Err(reason) => problems.push(format!("row {}: {reason}", i + 1)),
        }
    }

    if problems.is_empty() {
        Ok(items)
    } else {
        Err(ImportError::InvalidRows(problems))
    }
}

// =============================================================================
// Images
// =============================================================================

/// Turns the image link written in the sheet into a URL Stripe can show.
#[async_trait]
pub trait ImageResolver: Send + Sync {
    /// Direct image URL for `url`.
    ///
    /// # Errors
    ///
    /// Returns `ImportError::Image` when the link cannot be followed.
    async fn resolve(&self, url: &str) -> Result<String, ImportError>;
}

/// Uses links exactly as written.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectImages;

#[async_trait]
impl ImageResolver for DirectImages {
    async fn resolve(&self, url: &str) -> Result<String, ImportError> {
        Ok(url.to_string())
    }
}

/// Follows image-host share pages (e.g. `ibb.co/...`) to the image itself by
/// reading the page's `og:image` tag. Links that already serve an image are
/// returned unchanged.
#[derive(Debug, Clone)]
pub struct ShareLinkResolver {
    client: reqwest::Client,
}

impl ShareLinkResolver {
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new() -> Result<Self, ImportError> {
        let client = reqwest::Client::builder()
            .timeout(IMAGE_TIMEOUT)
            .build()
            .map_err(PaymentError::from)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageResolver for ShareLinkResolver {
    async fn resolve(&self, url: &str) -> Result<String, ImportError> {
        let failed = |reason: String| ImportError::Image {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| failed(e.to_string()))?;

        let is_image = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("image/"));
        if is_image {
            return Ok(url.to_string());
        }

        let html = response.text().await.map_err(|e| failed(e.to_string()))?;
        og_image(&html).ok_or_else(|| failed("no og:image tag".to_string()))
    }
}

/// The `og:image` URL of an HTML page.
#[must_use]
pub fn og_image(html: &str) -> Option<String> {
    OG_IMAGE_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

// =============================================================================
// Import
// =============================================================================

enum Outcome {
    Created(CatalogProduct),
    Updated { repriced: bool },
}

/// Create or update one product per menu item.
///
/// A failing item is logged and counted; the rest still import. An image
/// that cannot be resolved falls back to the placeholder.
///
/// # Errors
///
/// Returns an error only if the existing catalog cannot be listed.
pub async fn import_menu(
    payments: &dyn PaymentProcessor,
    images: &dyn ImageResolver,
    items: &[MenuItem],
) -> Result<ImportSummary, ImportError> {
    let mut catalog = payments.list_products(false).await?;
    info!(
        items = items.len(),
        existing = catalog.len(),
        "Starting menu import"
    );

    let mut summary = ImportSummary::default();
    for item in items {
        let image = match &item.image_url {
            Some(url) => match images.resolve(url).await {
                Ok(image) => Some(image),
                Err(e) => {
                    warn!(name = %item.name, error = %e, "Using placeholder image");
                    None
                }
            },
            None => None,
        };

        let current = catalog.iter().find(|p| p.name == item.name);
        match import_item(payments, item, image, current).await {
            Ok(Outcome::Created(product)) => {
                summary.created += 1;
                catalog.push(product);
            }
            Ok(Outcome::Updated { repriced }) => {
                summary.updated += 1;
                if repriced {
                    summary.repriced += 1;
                }
            }
            Err(e) => {
                error!(name = %item.name, error = %e, "Failed to import product");
                summary.failed += 1;
            }
        }
    }

    info!(
        created = summary.created,
        updated = summary.updated,
        repriced = summary.repriced,
        failed = summary.failed,
        "Menu import complete"
    );
    Ok(summary)
}

async fn import_item(
    payments: &dyn PaymentProcessor,
    item: &MenuItem,
    image: Option<String>,
    current: Option<&CatalogProduct>,
) -> Result<Outcome, ImportError> {
    let Some(current) = current else {
        let draft = item.draft(image);
        let product_id = payments.create_product(&draft).await?;
        let price_id = replace_price(payments, &product_id, None, item.price).await?;
        info!(%product_id, name = %item.name, price = %item.price, "Product created");

        return Ok(Outcome::Created(CatalogProduct {
            id: product_id.into_inner(),
            name: draft.name,
            description: draft.description,
            price: item.price.to_amount_string(),
            price_id: price_id.into_inner(),
            image: draft.image.unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
            category: draft.category,
            active: true,
        }));
    };

    let product_id = ProductId::parse(&current.id)?;
    // A row without an image keeps whatever the product already shows.
    let image = image.or_else(|| Some(current.image.clone()).filter(|i| i != PLACEHOLDER_IMAGE));
    payments
        .update_product(&product_id, &item.draft(image))
        .await?;

    let old_price_id = match current.price_id.as_str() {
        "" => None,
        id => Some(PriceId::parse(id)?),
    };
    let current_amount = match &old_price_id {
        Some(price_id) => payments.retrieve_price_amount(price_id).await?,
        None => None,
    };
    if current_amount == Some(item.price) {
        info!(%product_id, name = %item.name, "Product updated");
        return Ok(Outcome::Updated { repriced: false });
    }

    let new_price_id = replace_price(payments, &product_id, old_price_id.as_ref(), item.price).await?;
    info!(
        %product_id,
        %new_price_id,
        name = %item.name,
        price = %item.price,
        "Product updated with new price"
    );
    Ok(Outcome::Updated { repriced: true })
}

/// Read `path` and import it with the Stripe key from the environment.
///
/// # Errors
///
/// Returns an error if the file is unreadable or invalid, the Stripe key is
/// missing, or the catalog cannot be listed.
pub async fn run(path: &Path, options: ImportOptions) -> Result<ImportSummary, ImportError> {
    let file = std::fs::File::open(path)?;
    let items = match read_menu(file) {
        Ok(items) => items,
        Err(ImportError::InvalidRows(problems)) => {
            error!("Menu validation failed:");
            for problem in &problems {
                error!("  - {problem}");
            }
            return Err(ImportError::InvalidRows(problems));
        }
        Err(e) => return Err(e),
    };
    info!(path = %path.display(), items = items.len(), "Parsed menu");

    if options.dry_run {
        for item in &items {
            info!(name = %item.name, category = %item.category, price = %item.price, "Would import");
        }
        return Ok(ImportSummary::default());
    }

    let payments = StripeClient::from_secret_key(&stripe_secret_key_from_env()?)?;
    if options.direct_images {
        import_menu(&payments, &DirectImages, &items).await
    } else {
        import_menu(&payments, &ShareLinkResolver::new()?, &items).await
    }
}
