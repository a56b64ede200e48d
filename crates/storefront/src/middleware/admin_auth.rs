//! Admin password check with brute-force protection.
//!
//! Admin endpoints carry the password in the request body, so this is a
//! function handlers call after deserializing rather than a layer. Only failed
//! attempts count against the `admin-auth:<ip>` budget; once it is spent every
//! attempt, correct or not, gets 429 until the window resets.

use secrecy::ExposeSecret;
use sunville_core::guard::{RateLimitPolicy, constant_time_compare};
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;

/// Message returned once the failed-attempt budget is spent.
pub const TOO_MANY_ATTEMPTS: &str = "Too many failed attempts. Please try again later.";

/// Verify the admin password for a request from `client_ip`.
///
/// # Errors
///
/// Returns `RateLimited` when the client has too many recent failures and
/// `Unauthorized` when the password is wrong.
pub fn verify_admin(state: &AppState, client_ip: &str, password: &str) -> Result<(), AppError> {
    let policy = RateLimitPolicy::ADMIN_AUTH;
    let key = policy.key(client_ip);
    let limiter = state.limiter();

    if limiter.is_limited(&key, policy.limit) {
        warn!(client_ip, "Admin auth rate limited");
        return Err(AppError::RateLimited(TOO_MANY_ATTEMPTS.to_string()));
    }

    if constant_time_compare(password, state.config().admin_password.expose_secret()) {
        return Ok(());
    }

    limiter.check(&key, policy.limit, policy.window);
    warn!(client_ip, "Failed admin login attempt");
    Err(AppError::Unauthorized)
}
