//! Test harness for the Sunville Bakery storefront.
//!
//! Builds the real axum [`Router`] around in-memory fakes for the payment
//! processor and the mailer, with the data and upload directories in a
//! temporary directory. Tests drive it with `tower::ServiceExt::oneshot`.
//!
//! ```rust,ignore
//! let ctx = TestContext::new();
//! let (status, body) = ctx.get("/api/products").await;
//! assert_eq!(status, StatusCode::OK);
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode, header::CONTENT_TYPE},
};
use chrono::FixedOffset;
use secrecy::SecretString;
use serde_json::Value;
use sunville_core::{Price, PriceId, ProductId};
use sunville_storefront::config::{
    DEFAULT_EMAIL_FROM, DEFAULT_NOTIFICATION_EMAIL, EmailConfig, StorefrontConfig, StripeConfig,
};
use sunville_storefront::services::{
    CatalogProduct, CheckoutSession, CheckoutSessionRequest, Mailer, MailerError, OutgoingEmail,
    PaymentError, PaymentProcessor, ProductDraft, SessionLineItem,
};
use sunville_storefront::state::AppState;
use tempfile::TempDir;
use tower::ServiceExt;

/// Admin password configured for every test context.
pub const ADMIN_PASSWORD: &str = "sunville-admin-test-pw";

/// Stripe webhook signing secret configured for every test context.
pub const WEBHOOK_SECRET: &str = "whsec_test_k2nL5pQ7rT0uW4zC6";

/// Hosted checkout URL returned by [`FakePayments`].
pub const CHECKOUT_URL: &str = "https://checkout.stripe.test/c/pay/cs_test_1";

// =============================================================================
// Fake payment processor
// =============================================================================

#[derive(Debug, Default)]
struct PaymentsState {
    products: Vec<CatalogProduct>,
    prices: HashMap<String, Price>,
    sessions: Vec<CheckoutSessionRequest>,
    line_items: Vec<SessionLineItem>,
    calls: Vec<String>,
}

/// In-memory [`PaymentProcessor`] that records every call.
#[derive(Debug, Default)]
pub struct FakePayments {
    state: Mutex<PaymentsState>,
    next_id: AtomicU32,
    list_calls: AtomicU32,
    fail_checkout: AtomicBool,
}

impl FakePayments {
    fn lock(&self) -> MutexGuard<'_, PaymentsState> {
        self.state.lock().expect("fake payments lock poisoned")
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{prefix}{n}")
    }

    /// Add a catalog product with a default price.
    pub fn add_product(&self, id: &str, name: &str, price_id: &str, price: &str, active: bool) {
        let amount = Price::parse(price).expect("valid test price");
        let mut state = self.lock();
        state.prices.insert(price_id.to_string(), amount);
        state.products.push(CatalogProduct {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            price: amount.to_amount_string(),
            price_id: price_id.to_string(),
            image: "/placeholder.svg".to_string(),
            category: "Buns".to_string(),
            active,
        });
    }

    /// Line items returned for any completed session.
    pub fn set_line_items(&self, items: Vec<SessionLineItem>) {
        self.lock().line_items = items;
    }

    /// Make the next checkout session calls fail with an API error.
    pub fn fail_checkout(&self, fail: bool) {
        self.fail_checkout.store(fail, Ordering::Relaxed);
    }

    /// Checkout sessions created so far.
    #[must_use]
    pub fn sessions(&self) -> Vec<CheckoutSessionRequest> {
        self.lock().sessions.clone()
    }

    /// Mutating calls made so far, e.g. `"archive_price price_1"`.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Number of `list_products` calls that reached the fake.
    #[must_use]
    pub fn list_calls(&self) -> u32 {
        self.list_calls.load(Ordering::Relaxed)
    }

    /// Current product by id.
    #[must_use]
    pub fn product(&self, id: &str) -> Option<CatalogProduct> {
        self.lock().products.iter().find(|p| p.id == id).cloned()
    }

    fn record(&self, call: String) {
        self.lock().calls.push(call);
    }
}

#[async_trait]
impl PaymentProcessor for FakePayments {
    async fn list_products(&self, active_only: bool) -> Result<Vec<CatalogProduct>, PaymentError> {
        self.list_calls.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .lock()
            .products
            .iter()
            .filter(|p| !active_only || p.active)
            .cloned()
            .collect())
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        if self.fail_checkout.load(Ordering::Relaxed) {
            return Err(PaymentError::Api {
                status: 400,
                message: "No such price".to_string(),
            });
        }
        let id = self.next_id("cs_test_");
        self.lock().sessions.push(request.clone());
        Ok(CheckoutSession {
            id,
            url: CHECKOUT_URL.to_string(),
        })
    }

    async fn set_product_active(
        &self,
        product_id: &ProductId,
        active: bool,
    ) -> Result<(), PaymentError> {
        self.record(format!("set_product_active {product_id} {active}"));
        if let Some(product) = self
            .lock()
            .products
            .iter_mut()
            .find(|p| p.id == product_id.as_str())
        {
            product.active = active;
        }
        Ok(())
    }

    async fn create_product(&self, draft: &ProductDraft) -> Result<ProductId, PaymentError> {
        let id = self.next_id("prod_");
        self.record(format!("create_product {}", draft.name));
        self.lock().products.push(CatalogProduct {
            id: id.clone(),
            name: draft.name.clone(),
            description: draft.description.clone(),
            price: "0.00".to_string(),
            price_id: String::new(),
            image: draft
                .image
                .clone()
                .unwrap_or_else(|| "/placeholder.svg".to_string()),
            category: draft.category.clone(),
            active: true,
        });
        Ok(ProductId::parse(&id).expect("valid fake product id"))
    }

    async fn update_product(
        &self,
        product_id: &ProductId,
        draft: &ProductDraft,
    ) -> Result<(), PaymentError> {
        self.record(format!("update_product {product_id}"));
        if let Some(product) = self
            .lock()
            .products
            .iter_mut()
            .find(|p| p.id == product_id.as_str())
        {
            product.name.clone_from(&draft.name);
            product.description.clone_from(&draft.description);
            product.category.clone_from(&draft.category);
        }
        Ok(())
    }

    async fn archive_product(&self, product_id: &ProductId) -> Result<(), PaymentError> {
        self.set_product_active(product_id, false).await
    }

    async fn retrieve_price_amount(
        &self,
        price_id: &PriceId,
    ) -> Result<Option<Price>, PaymentError> {
        Ok(self.lock().prices.get(price_id.as_str()).copied())
    }

    async fn create_price(
        &self,
        product_id: &ProductId,
        amount: Price,
    ) -> Result<PriceId, PaymentError> {
        let id = self.next_id("price_");
        self.record(format!("create_price {product_id} {}", amount.to_cents()));
        self.lock().prices.insert(id.clone(), amount);
        Ok(PriceId::parse(&id).expect("valid fake price id"))
    }

    async fn archive_price(&self, price_id: &PriceId) -> Result<(), PaymentError> {
        self.record(format!("archive_price {price_id}"));
        Ok(())
    }

    async fn set_default_price(
        &self,
        product_id: &ProductId,
        price_id: &PriceId,
    ) -> Result<(), PaymentError> {
        self.record(format!("set_default_price {product_id} {price_id}"));
        let mut state = self.lock();
        let amount = state.prices.get(price_id.as_str()).copied();
        if let Some(product) = state
            .products
            .iter_mut()
            .find(|p| p.id == product_id.as_str())
        {
            product.price_id = price_id.to_string();
            if let Some(amount) = amount {
                product.price = amount.to_amount_string();
            }
        }
        Ok(())
    }

    async fn list_session_line_items(
        &self,
        session_id: &str,
    ) -> Result<Vec<SessionLineItem>, PaymentError> {
        self.record(format!("list_session_line_items {session_id}"));
        Ok(self.lock().line_items.clone())
    }
}

// =============================================================================
// Fake mailer
// =============================================================================

/// In-memory [`Mailer`] that keeps every sent email.
#[derive(Debug, Default)]
pub struct FakeMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail: AtomicBool,
}

impl FakeMailer {
    /// Emails sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().expect("fake mailer lock poisoned").clone()
    }

    /// Make every send fail.
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailerError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(MailerError::Api {
                status: 500,
                message: "mailer down".to_string(),
            });
        }
        self.sent
            .lock()
            .expect("fake mailer lock poisoned")
            .push(email.clone());
        Ok(())
    }
}

// =============================================================================
// Test context
// =============================================================================

/// A storefront wired to fakes, backed by a temporary directory.
pub struct TestContext {
    pub app: Router,
    pub state: AppState,
    pub payments: Arc<FakePayments>,
    pub mailer: Arc<FakeMailer>,
    pub dir: TempDir,
}

/// A response decoded for assertions.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestContext {
    /// Storefront with maintenance mode off.
    #[must_use]
    pub fn new() -> Self {
        Self::with_maintenance(false)
    }

    /// Storefront with the given maintenance default.
    #[must_use]
    pub fn with_maintenance(maintenance: bool) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config = test_config(dir.path().join("data"), dir.path().join("uploads"), maintenance);

        let payments = Arc::new(FakePayments::default());
        let mailer = Arc::new(FakeMailer::default());
        let state = AppState::new(config, payments.clone(), mailer.clone())
            .expect("build application state");

        Self {
            app: sunville_storefront::app(state.clone()),
            state,
            payments,
            mailer,
            dir,
        }
    }

    /// Directory uploads are written to.
    #[must_use]
    pub fn upload_dir(&self) -> PathBuf {
        self.state.config().upload_dir.clone()
    }

    /// Send a request through the full middleware stack.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read response body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// GET `path`.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.send(
            Request::builder()
                .uri(path)
                .body(Body::empty())
                .expect("build request"),
        )
        .await
    }

    /// Send `body` as JSON from client address `ip`.
    pub async fn json(&self, method: &str, path: &str, ip: &str, body: &Value) -> TestResponse {
        self.send(
            Request::builder()
                .method(method)
                .uri(path)
                .header(CONTENT_TYPE, "application/json")
                .header("x-forwarded-for", ip)
                .body(Body::from(body.to_string()))
                .expect("build request"),
        )
        .await
    }

    /// POST `body` as JSON from client address `ip`.
    pub async fn post(&self, path: &str, ip: &str, body: &Value) -> TestResponse {
        self.json("POST", path, ip, body).await
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration pointing at the given directories.
#[must_use]
pub fn test_config(data_dir: PathBuf, upload_dir: PathBuf, maintenance: bool) -> StorefrontConfig {
    StorefrontConfig {
        host: std::net::IpAddr::from([127, 0, 0, 1]),
        port: 3000,
        base_url: "https://sunvillebakery.test".to_string(),
        admin_password: SecretString::from(ADMIN_PASSWORD),
        stripe: StripeConfig {
            secret_key: SecretString::from("sk_test_51Hx9QmK2nL5pQ7rT0uW4zC6"),
            webhook_secret: SecretString::from(WEBHOOK_SECRET),
        },
        email: EmailConfig {
            resend_api_key: SecretString::from("re_aB3xY9mK2nL5pQ7rT0uW4"),
            from: DEFAULT_EMAIL_FROM.to_string(),
            notification_email: DEFAULT_NOTIFICATION_EMAIL.to_string(),
        },
        data_dir,
        upload_dir,
        maintenance_default: maintenance,
        utc_offset: FixedOffset::west_opt(8 * 3600).expect("valid offset"),
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// Build a multipart body with a `password` field and an optional file.
#[must_use]
pub fn multipart_body(
    boundary: &str,
    password: &str,
    file: Option<(&str, &str, &[u8])>,
) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"password\"\r\n\r\n{password}\r\n"
        )
        .as_bytes(),
    );
    if let Some((filename, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}
