//! Notification emails sent to the bakery.
//!
//! Templates are inline askama sources with HTML auto-escaping, so every
//! customer-supplied value is escaped before it reaches the inbox.

use askama::Template;
use sunville_core::Price;
use sunville_core::guard::escape_html;

use super::email::{MailerError, OutgoingEmail};
use super::payments::SessionLineItem;
use crate::config::EmailConfig;

#[derive(Template)]
#[template(
    ext = "html",
    source = r#"<h2>New Contact Form Submission</h2>
<p><strong>Name:</strong> {{ name }}</p>
<p><strong>Email:</strong> {{ email }}</p>
<p><strong>Phone:</strong> {{ phone }}</p>
<p><strong>Message:</strong></p>
<p>{{ message_html|safe }}</p>
"#
)]
struct ContactTemplate<'a> {
    name: &'a str,
    email: &'a str,
    phone: &'a str,
    /// Already escaped, with line breaks turned into `<br>`.
    message_html: String,
}

#[derive(Template)]
#[template(
    ext = "html",
    source = r#"<!DOCTYPE html>
<html>
  <body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
      <h1 style="background-color: #10b981; color: white; padding: 20px; text-align: center;">New Order Received!</h1>
      <h2>Order Details</h2>
      <p><strong>Customer:</strong> {{ customer_name }}</p>
      <p><strong>Email:</strong> {{ customer_email }}</p>
      <p><strong>Pickup Time:</strong> {{ pickup_time }}</p>
      <p><strong>Order ID:</strong> {{ order_id }}</p>
      <h3>Items Ordered:</h3>
      {% for item in items %}
      <div style="padding: 10px 0; border-bottom: 1px solid #e5e7eb;">
        <strong>{{ item.name }}</strong> {{ item.total }}<br>
        <span style="color: #6b7280;">Qty: {{ item.quantity }} &times; {{ item.unit_price }}</span>
      </div>
      {% endfor %}
      <p style="font-size: 1.2em; font-weight: bold; color: #10b981;">Total: {{ total }} USD</p>
      <p style="color: #6b7280; font-size: 0.9em;">This order was automatically generated from your Sunville Bakery website.</p>
    </div>
  </body>
</html>
"#
)]
struct OrderTemplate<'a> {
    customer_name: &'a str,
    customer_email: &'a str,
    pickup_time: &'a str,
    order_id: &'a str,
    items: Vec<OrderLine>,
    total: Price,
}

struct OrderLine {
    name: String,
    quantity: u32,
    unit_price: Price,
    total: Price,
}

/// A contact form submission that passed validation.
#[derive(Debug, Clone)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
}

/// A paid order, as reported by the completion webhook.
#[derive(Debug, Clone)]
pub struct OrderSummary {
    pub order_id: String,
    pub customer_name: String,
    pub customer_email: String,
    /// Sanitized pickup time.
    pub pickup_time: String,
    pub items: Vec<SessionLineItem>,
    pub total: Price,
}

/// Email the bakery a contact form submission. Replies go to the sender.
///
/// # Errors
///
/// Returns an error if the template fails to render.
pub fn contact_email(
    config: &EmailConfig,
    contact: &ContactMessage,
) -> Result<OutgoingEmail, MailerError> {
    let html = ContactTemplate {
        name: &contact.name,
        email: &contact.email,
        phone: contact.phone.as_deref().unwrap_or("Not provided"),
        message_html: escape_html(&contact.message).replace('\n', "<br>"),
    }
    .render()?;

    Ok(OutgoingEmail {
        from: config.from.clone(),
        to: vec![config.notification_email.clone()],
        subject: format!("New Contact Form Submission from {}", contact.name),
        html,
        reply_to: Some(contact.email.clone()),
    })
}

/// Email the bakery a new order.
///
/// # Errors
///
/// Returns an error if the template fails to render.
pub fn order_email(
    config: &EmailConfig,
    order: &OrderSummary,
) -> Result<OutgoingEmail, MailerError> {
    let html = OrderTemplate {
        customer_name: &order.customer_name,
        customer_email: &order.customer_email,
        pickup_time: &order.pickup_time,
        order_id: &order.order_id,
        items: order
            .items
            .iter()
            .map(|item| OrderLine {
                name: item.name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_amount,
                total: item.total(),
            })
            .collect(),
        total: order.total,
    }
    .render()?;

    Ok(OutgoingEmail {
        from: config.from.clone(),
        to: vec![config.notification_email.clone()],
        subject: format!("New Order: {} - Pickup {}", order.total, order.pickup_time),
        html,
        reply_to: None,
    })
}
