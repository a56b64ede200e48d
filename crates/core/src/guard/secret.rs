//! Constant-time secret comparison.

use std::hint::black_box;

/// Compare two secrets in time independent of where they first differ.
///
/// Both inputs are walked to the length of the longer one; missing bytes are
/// compared against zero and the length difference is folded into the
/// accumulator. There is no early return on length mismatch, so an attacker
/// timing admin-password checks learns neither the mismatch position nor
/// whether the lengths matched.
#[must_use]
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let len = a.len().max(b.len());

    let mut diff = a.len() ^ b.len();
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        diff |= usize::from(black_box(x ^ y));
    }

    black_box(diff) == 0
}
