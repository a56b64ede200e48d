//! Outgoing email through Resend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use crate::config::EmailConfig;

/// Resend API endpoint for sending a single email.
const SEND_URL: &str = "https://api.resend.com/emails";

/// Outbound request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum MailerError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The message body could not be rendered.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Client configuration is unusable.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A rendered email ready to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

/// Something that can deliver an [`OutgoingEmail`].
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send one email.
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailerError>;
}

/// Resend API client.
#[derive(Clone)]
pub struct ResendClient {
    inner: Arc<ResendClientInner>,
}

struct ResendClientInner {
    client: reqwest::Client,
    endpoint: String,
}

impl ResendClient {
    /// Create a new Resend client.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &EmailConfig) -> Result<Self, MailerError> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", config.resend_api_key.expose_secret());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value)
                .map_err(|e| MailerError::Config(format!("Invalid API key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(ResendClientInner {
                client,
                endpoint: SEND_URL.to_string(),
            }),
        })
    }
}

#[async_trait]
impl Mailer for ResendClient {
    #[instrument(skip(self, email), fields(subject = %email.subject))]
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailerError> {
        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .json(email)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MailerError::Api {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        tracing::info!("Notification email sent");
        Ok(())
    }
}
