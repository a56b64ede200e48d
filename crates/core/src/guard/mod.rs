//! Request guard: rate limiting and input sanitization for API endpoints.
//!
//! Endpoints call into this module before handing anything to the payment
//! processor, the mailer or the filesystem:
//!
//! ```
//! use sunville_core::guard::{RateLimitPolicy, RateLimiter, sanitize_pickup_time};
//!
//! let limiter = RateLimiter::new();
//! assert!(limiter.check_policy(&RateLimitPolicy::CHECKOUT, "203.0.113.7"));
//! assert_eq!(sanitize_pickup_time(Some("<script>")), "ASAP");
//! ```

pub mod rate_limit;
pub mod sanitize;
pub mod secret;

pub use rate_limit::{RateLimitPolicy, RateLimitRecord, RateLimiter};
pub use sanitize::{
    MAX_FILENAME_LENGTH, escape_html, is_valid_email, is_valid_phone, sanitize_filename,
    sanitize_pickup_time,
};
pub use secret::constant_time_compare;
