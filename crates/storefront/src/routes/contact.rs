//! Contact form route handler.
//!
//! Submissions are emailed to the bakery with `reply_to` set to the sender.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use sunville_core::Email;
use sunville_core::guard::{RateLimitPolicy, is_valid_phone};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::extract::ApiJson;
use crate::middleware::ClientIp;
use crate::services::notifications::{ContactMessage, contact_email};
use crate::state::AppState;

/// Longest accepted name, in characters.
pub const MAX_NAME_LENGTH: usize = 100;

/// Longest accepted message, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 5000;

/// Contact form data.
#[derive(Debug, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub message: String,
}

/// Response for a successful submission.
#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub success: bool,
}

impl ContactForm {
    /// Trim and validate every field.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error naming the first bad field.
    pub fn validate(&self) -> Result<ContactMessage> {
        let name = self.name.trim();
        let email = self.email.trim();
        let message = self.message.trim();

        if name.is_empty() || email.is_empty() || message.is_empty() {
            return Err(AppError::Validation(
                "Name, email, and message are required".to_string(),
            ));
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(AppError::Validation(format!(
                "Name is too long (max {MAX_NAME_LENGTH} characters)"
            )));
        }
        if message.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(AppError::Validation(format!(
                "Message is too long (max {MAX_MESSAGE_LENGTH} characters)"
            )));
        }

        let email = Email::parse(email).map_err(|_| {
            AppError::Validation("Please enter a valid email address".to_string())
        })?;

        let phone = match self.phone.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(phone) if is_valid_phone(phone) => Some(phone.to_string()),
            Some(_) => {
                return Err(AppError::Validation(
                    "Please enter a valid phone number".to_string(),
                ));
            }
        };

        Ok(ContactMessage {
            name: name.to_string(),
            email: email.into_inner(),
            phone,
            message: message.to_string(),
        })
    }
}

/// Submit the contact form.
///
/// POST /api/contact
#[instrument(skip(state, form))]
pub async fn submit(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    ApiJson(form): ApiJson<ContactForm>,
) -> Result<Json<ContactResponse>> {
    if !state
        .limiter()
        .check_policy(&RateLimitPolicy::CONTACT, &client_ip)
    {
        tracing::warn!(client_ip, "Contact form rate limited");
        return Err(AppError::RateLimited(
            "Too many messages. Please try again later.".to_string(),
        ));
    }

    let contact = form.validate()?;
    let email = contact_email(&state.config().email, &contact)?;
    state.mailer().send(&email).await?;

    tracing::info!("Contact form submitted");
    Ok(Json(ContactResponse { success: true }))
}
