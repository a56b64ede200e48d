//! External services for the storefront.
//!
//! # Services
//!
//! - `payments` - Payment processor contract and catalog types
//! - `stripe` - Stripe implementation plus webhook verification
//! - `email` - Mailer contract and the Resend client
//! - `notifications` - Order and contact emails sent to the bakery

pub mod email;
pub mod notifications;
pub mod payments;
pub mod stripe;

pub use email::{Mailer, MailerError, OutgoingEmail, ResendClient};
pub use payments::{
    CatalogProduct, CheckoutSession, CheckoutSessionRequest, PaymentError, PaymentProcessor,
    ProductDraft, SessionLineItem,
};
pub use stripe::StripeClient;
