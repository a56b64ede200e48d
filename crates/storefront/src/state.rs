//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sunville_core::guard::RateLimiter;

use crate::config::StorefrontConfig;
use crate::services::{CatalogProduct, Mailer, PaymentError, PaymentProcessor};
use crate::stores::{GalleryStore, MaintenanceFlag, StoreError};

/// How long the public product list is cached.
const PRODUCT_CACHE_TTL: Duration = Duration::from_secs(60);

/// File names inside the data directory.
const GALLERY_FILE: &str = "gallery.json";
const MAINTENANCE_FILE: &str = "maintenance.json";

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// payment processor, the mailer, the rate limiter and the file-backed stores.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    payments: Arc<dyn PaymentProcessor>,
    mailer: Arc<dyn Mailer>,
    limiter: Arc<RateLimiter>,
    gallery: GalleryStore,
    maintenance: MaintenanceFlag,
    products: Cache<(), Arc<Vec<CatalogProduct>>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `payments` - Payment processor (Stripe in production)
    /// * `mailer` - Email delivery (Resend in production)
    ///
    /// # Errors
    ///
    /// Returns an error if the saved maintenance flag cannot be read.
    pub fn new(
        config: StorefrontConfig,
        payments: Arc<dyn PaymentProcessor>,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self, StoreError> {
        let gallery = GalleryStore::new(config.data_dir.join(GALLERY_FILE));
        let maintenance = MaintenanceFlag::load(
            config.data_dir.join(MAINTENANCE_FILE),
            config.maintenance_default,
        )?;
        let products = Cache::builder()
            .max_capacity(1)
            .time_to_live(PRODUCT_CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                payments,
                mailer,
                limiter: Arc::new(RateLimiter::new()),
                gallery,
                maintenance,
                products,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the payment processor.
    #[must_use]
    pub fn payments(&self) -> &dyn PaymentProcessor {
        self.inner.payments.as_ref()
    }

    /// Get a reference to the mailer.
    #[must_use]
    pub fn mailer(&self) -> &dyn Mailer {
        self.inner.mailer.as_ref()
    }

    /// Get the shared rate limiter.
    #[must_use]
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.inner.limiter
    }

    /// Get the gallery store.
    #[must_use]
    pub fn gallery(&self) -> &GalleryStore {
        &self.inner.gallery
    }

    /// Get the maintenance flag.
    #[must_use]
    pub fn maintenance(&self) -> &MaintenanceFlag {
        &self.inner.maintenance
    }

    /// Active products, served from a 60-second cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache is cold and the processor call fails.
    pub async fn active_products(&self) -> Result<Arc<Vec<CatalogProduct>>, PaymentError> {
        if let Some(products) = self.inner.products.get(&()).await {
            tracing::debug!("Cache hit for products");
            return Ok(products);
        }

        let products = Arc::new(self.payments().list_products(true).await?);
        self.inner.products.insert((), products.clone()).await;
        Ok(products)
    }

    /// Drop the cached product list after an admin change.
    pub async fn invalidate_products(&self) {
        self.inner.products.invalidate(&()).await;
    }
}
