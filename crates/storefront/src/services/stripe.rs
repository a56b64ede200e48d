//! Stripe API client and webhook verification.
//!
//! Talks to the REST API directly with `reqwest`: form-encoded request
//! bodies, bearer authentication, JSON responses.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use sha2::Sha256;
use sunville_core::guard::constant_time_compare;
use sunville_core::{Price, PriceId, ProductId};
use thiserror::Error;
use tracing::{debug, instrument};

use super::payments::{
    CatalogProduct, CheckoutSession, CheckoutSessionRequest, DEFAULT_CATEGORY, PLACEHOLDER_IMAGE,
    PaymentError, PaymentProcessor, ProductDraft, SessionLineItem,
};
use crate::config::StripeConfig;

/// Stripe API base URL.
const BASE_URL: &str = "https://api.stripe.com/v1";

/// Outbound request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest page Stripe returns.
const PAGE_LIMIT: &str = "100";

/// Oldest webhook timestamp accepted, in seconds.
pub const WEBHOOK_TOLERANCE_SECS: i64 = 300;

// =============================================================================
// StripeClient
// =============================================================================

/// Client for the Stripe REST API.
#[derive(Clone)]
pub struct StripeClient {
    inner: Arc<StripeClientInner>,
}

struct StripeClientInner {
    client: reqwest::Client,
    base_url: String,
}

impl StripeClient {
    /// Create a new Stripe API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, PaymentError> {
        Self::from_secret_key(&config.secret_key)
    }

    /// Create a client from just the secret key, for tools that never see
    /// webhooks.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn from_secret_key(secret_key: &SecretString) -> Result<Self, PaymentError> {
        Self::with_base_url(secret_key, BASE_URL)
    }

    /// Create a client against a different API host, e.g. a local mock.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn with_base_url(secret_key: &SecretString, base_url: &str) -> Result<Self, PaymentError> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", secret_key.expose_secret());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value)
                .map_err(|e| PaymentError::Parse(format!("Invalid API key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(StripeClientInner {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
            }),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, PaymentError> {
        let response = self
            .inner
            .client
            .get(self.url(path))
            .query(query)
            .send()
            .await?;
        parse_response(response).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T, PaymentError> {
        let response = self
            .inner
            .client
            .post(self.url(path))
            .form(form)
            .send()
            .await?;
        parse_response(response).await
    }
}

/// Map a Stripe response onto `T` or a [`PaymentError`].
async fn parse_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, PaymentError> {
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(PaymentError::RateLimited(retry_after));
    }

    let body = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ApiErrorBody>(&body).map_or_else(
            |_| body.chars().take(200).collect(),
            |e| e.error.message.unwrap_or_default(),
        );
        tracing::error!(status = %status, message = %message, "Stripe API returned non-success status");
        return Err(PaymentError::Api {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %body.chars().take(500).collect::<String>(),
            "Failed to parse Stripe response"
        );
        PaymentError::Parse(e.to_string())
    })
}

fn draft_form(draft: &ProductDraft) -> Vec<(String, String)> {
    let mut form = vec![
        ("name".to_string(), draft.name.clone()),
        ("description".to_string(), draft.description.clone()),
        ("metadata[category]".to_string(), draft.category.clone()),
    ];
    match &draft.image {
        Some(image) => form.push(("images[0]".to_string(), image.clone())),
        // An empty value clears the list.
        None => form.push(("images".to_string(), String::new())),
    }
    form
}

fn checkout_form(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        ("metadata[pickupTime]".to_string(), request.pickup_time.clone()),
        ("metadata[productName]".to_string(), request.product_name.clone()),
    ];
    for (i, item) in request.line_items.iter().enumerate() {
        form.push((
            format!("line_items[{i}][price]"),
            item.price_id.as_str().to_string(),
        ));
        form.push((
            format!("line_items[{i}][quantity]"),
            item.quantity.to_string(),
        ));
    }
    form
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    #[instrument(skip(self))]
    async fn list_products(&self, active_only: bool) -> Result<Vec<CatalogProduct>, PaymentError> {
        let mut query = vec![("limit", PAGE_LIMIT), ("expand[]", "data.default_price")];
        if active_only {
            query.push(("active", "true"));
        }

        let list: ListResponse<StripeProduct> = self.get("/products", &query).await?;
        debug!(count = list.data.len(), "Fetched products");
        Ok(list.data.into_iter().map(CatalogProduct::from).collect())
    }

    #[instrument(skip(self, request), fields(lines = request.line_items.len()))]
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let session: StripeSession = self
            .post("/checkout/sessions", &checkout_form(request))
            .await?;
        let url = session
            .url
            .ok_or_else(|| PaymentError::Parse("checkout session has no url".to_string()))?;
        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn set_product_active(
        &self,
        product_id: &ProductId,
        active: bool,
    ) -> Result<(), PaymentError> {
        let form = [("active".to_string(), active.to_string())];
        let _: StripeObject = self.post(&format!("/products/{product_id}"), &form).await?;
        Ok(())
    }

    #[instrument(skip(self, draft), fields(name = %draft.name))]
    async fn create_product(&self, draft: &ProductDraft) -> Result<ProductId, PaymentError> {
        let mut form = draft_form(draft);
        form.retain(|(k, _)| k != "images");
        form.push(("active".to_string(), "true".to_string()));

        let created: StripeObject = self.post("/products", &form).await?;
        ProductId::parse(&created.id).map_err(|e| PaymentError::Parse(e.to_string()))
    }

    #[instrument(skip(self, draft), fields(product_id = %product_id))]
    async fn update_product(
        &self,
        product_id: &ProductId,
        draft: &ProductDraft,
    ) -> Result<(), PaymentError> {
        let _: StripeObject = self
            .post(&format!("/products/{product_id}"), &draft_form(draft))
            .await?;
        Ok(())
    }

    async fn archive_product(&self, product_id: &ProductId) -> Result<(), PaymentError> {
        self.set_product_active(product_id, false).await
    }

    #[instrument(skip(self), fields(price_id = %price_id))]
    async fn retrieve_price_amount(
        &self,
        price_id: &PriceId,
    ) -> Result<Option<Price>, PaymentError> {
        let price: StripePrice = self.get(&format!("/prices/{price_id}"), &[]).await?;
        Ok(price.unit_amount.map(Price::from_cents))
    }

    #[instrument(skip(self), fields(product_id = %product_id, amount = %amount))]
    async fn create_price(
        &self,
        product_id: &ProductId,
        amount: Price,
    ) -> Result<PriceId, PaymentError> {
        let form = [
            ("product".to_string(), product_id.to_string()),
            ("unit_amount".to_string(), amount.to_cents().to_string()),
            ("currency".to_string(), "usd".to_string()),
        ];
        let created: StripeObject = self.post("/prices", &form).await?;
        PriceId::parse(&created.id).map_err(|e| PaymentError::Parse(e.to_string()))
    }

    #[instrument(skip(self), fields(price_id = %price_id))]
    async fn archive_price(&self, price_id: &PriceId) -> Result<(), PaymentError> {
        let form = [("active".to_string(), "false".to_string())];
        let _: StripeObject = self.post(&format!("/prices/{price_id}"), &form).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %product_id, price_id = %price_id))]
    async fn set_default_price(
        &self,
        product_id: &ProductId,
        price_id: &PriceId,
    ) -> Result<(), PaymentError> {
        let form = [("default_price".to_string(), price_id.to_string())];
        let _: StripeObject = self.post(&format!("/products/{product_id}"), &form).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_session_line_items(
        &self,
        session_id: &str,
    ) -> Result<Vec<SessionLineItem>, PaymentError> {
        if !session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(PaymentError::Parse(format!(
                "invalid checkout session id: {session_id}"
            )));
        }

        let list: ListResponse<StripeLineItem> = self
            .get(
                &format!("/checkout/sessions/{session_id}/line_items"),
                &[("limit", PAGE_LIMIT)],
            )
            .await?;
        Ok(list.data.into_iter().map(SessionLineItem::from).collect())
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

/// Any object where only the id matters.
#[derive(Debug, Deserialize)]
struct StripeObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StripeProduct {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
    active: bool,
    #[serde(default)]
    default_price: Option<DefaultPrice>,
}

/// `default_price` is an id unless it was expanded.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DefaultPrice {
    Expanded(StripePrice),
    Id(String),
}

#[derive(Debug, Deserialize)]
struct StripePrice {
    id: String,
    #[serde(default)]
    unit_amount: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct StripeSession {
    id: String,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeLineItem {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    quantity: Option<u32>,
    #[serde(default)]
    price: Option<StripePrice>,
}

impl From<StripeProduct> for CatalogProduct {
    fn from(product: StripeProduct) -> Self {
        let (price, price_id) = match product.default_price {
            Some(DefaultPrice::Expanded(p)) => (
                p.unit_amount.map_or(Price::ZERO, Price::from_cents),
                p.id,
            ),
            Some(DefaultPrice::Id(id)) => (Price::ZERO, id),
            None => (Price::ZERO, String::new()),
        };

        Self {
            id: product.id,
            name: product.name,
            description: product.description.unwrap_or_default(),
            price: price.to_amount_string(),
            price_id,
            image: product
                .images
                .into_iter()
                .next()
                .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
            category: product
                .metadata
                .get("category")
                .filter(|c| !c.is_empty())
                .cloned()
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            active: product.active,
        }
    }
}

impl From<StripeLineItem> for SessionLineItem {
    fn from(item: StripeLineItem) -> Self {
        Self {
            name: item.description.unwrap_or_else(|| "Item".to_string()),
            quantity: item.quantity.unwrap_or(0),
            unit_amount: item
                .price
                .and_then(|p| p.unit_amount)
                .map_or(Price::ZERO, Price::from_cents),
        }
    }
}

// =============================================================================
// Webhooks
// =============================================================================

/// Errors raised while verifying and decoding a webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The `Stripe-Signature` header is missing or malformed.
    #[error("Malformed signature header: {0}")]
    MalformedHeader(String),

    /// The signed timestamp is outside the tolerance window.
    #[error("Webhook timestamp outside tolerance")]
    StaleTimestamp,

    /// No `v1` signature matched the payload.
    #[error("Signature mismatch")]
    SignatureMismatch,

    /// The payload is not a Stripe event.
    #[error("Invalid event payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Verify a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=<hex>...]`)
/// against the raw request body.
///
/// The signed payload is `"<t>.<body>"`, signed with HMAC-SHA256 under the
/// endpoint's signing secret. Any matching `v1` entry is accepted.
///
/// # Errors
///
/// Returns an error if the header is malformed, the timestamp is more than
/// [`WEBHOOK_TOLERANCE_SECS`] away from `now`, or no signature matches.
pub fn verify_webhook_signature(
    secret: &str,
    header: &str,
    payload: &str,
    now: i64,
) -> Result<(), WebhookError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| WebhookError::MalformedHeader("missing timestamp".to_string()))?;
    if signatures.is_empty() {
        return Err(WebhookError::MalformedHeader(
            "missing v1 signature".to_string(),
        ));
    }

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| WebhookError::MalformedHeader("invalid timestamp".to_string()))?;
    if (now - ts).abs() > WEBHOOK_TOLERANCE_SECS {
        return Err(WebhookError::StaleTimestamp);
    }

    let expected = sign_payload(secret, timestamp, payload)
        .ok_or_else(|| WebhookError::MalformedHeader("unusable signing secret".to_string()))?;

    if signatures
        .iter()
        .any(|candidate| constant_time_compare(&expected, candidate))
    {
        debug!("Stripe signature verified");
        Ok(())
    } else {
        Err(WebhookError::SignatureMismatch)
    }
}

/// Hex HMAC-SHA256 of `"<timestamp>.<payload>"`.
#[must_use]
pub fn sign_payload(secret: &str, timestamp: &str, payload: &str) -> Option<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Event type for a paid checkout.
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// A webhook event envelope.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

/// The object an event is about.
#[derive(Debug, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

/// The fields of a completed checkout session the order email needs.
#[derive(Debug, Deserialize)]
pub struct CompletedSession {
    pub id: String,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Customer contact details collected at checkout.
#[derive(Debug, Default, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl WebhookEvent {
    /// Parse an event from its raw JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not an event envelope.
    pub fn parse(payload: &str) -> Result<Self, WebhookError> {
        Ok(serde_json::from_str(payload)?)
    }

    /// The completed session, if this is a `checkout.session.completed` event.
    ///
    /// # Errors
    ///
    /// Returns an error if the event object is not a checkout session.
    pub fn completed_session(&self) -> Result<Option<CompletedSession>, WebhookError> {
        if self.event_type != CHECKOUT_SESSION_COMPLETED {
            return Ok(None);
        }
        Ok(Some(CompletedSession::deserialize(&self.data.object)?))
    }
}
