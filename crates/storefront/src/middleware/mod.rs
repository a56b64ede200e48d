//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers
//! 5. Maintenance gate
//! 6. Body size limit
//!
//! Rate limiting and admin auth run inside handlers because their keys depend
//! on the request body.

pub mod admin_auth;
pub mod client_ip;
pub mod maintenance;
pub mod request_id;
pub mod security_headers;

pub use admin_auth::verify_admin;
pub use client_ip::{ClientIp, client_ip};
pub use maintenance::maintenance_middleware;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
