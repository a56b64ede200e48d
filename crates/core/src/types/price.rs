//! Exact decimal prices in US dollars.
//!
//! Prices travel as strings with two fraction digits (`"3.25"`) so the menu,
//! the cart and the payment processor never disagree because of floating
//! point rounding. The payment processor itself wants integer cents.

use core::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors that can occur when parsing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input is not a decimal number.
    #[error("price must be a decimal number like 3.25")]
    Invalid,
    /// The amount is below zero.
    #[error("price cannot be negative")]
    Negative,
    /// More than two fraction digits.
    #[error("price cannot have more than two decimal places")]
    TooPrecise,
    /// The amount exceeds [`Price::MAX_CENTS`].
    #[error("price must be at most $10000.00")]
    TooLarge,
}

/// A non-negative amount of US dollars with at most two fraction digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(Decimal);

impl Price {
    /// Largest accepted price, in cents.
    pub const MAX_CENTS: i64 = 1_000_000;

    /// Zero dollars.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Parse a price from its decimal string form.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a decimal, is negative, has more
    /// than two fraction digits, or exceeds the maximum.
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let amount = Decimal::from_str(s.trim()).map_err(|_| PriceError::Invalid)?;
        Self::from_decimal(amount)
    }

    /// Validate an already-parsed amount.
    ///
    /// # Errors
    ///
    /// Same rules as [`Price::parse`].
    pub fn from_decimal(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        if amount.normalize().scale() > 2 {
            return Err(PriceError::TooPrecise);
        }
        if amount > Decimal::new(Self::MAX_CENTS, 2) {
            return Err(PriceError::TooLarge);
        }
        Ok(Self(amount))
    }

    /// Build a price from integer cents, as reported by the payment processor.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents.max(0), 2))
    }

    /// Amount in integer cents, for the payment processor.
    #[must_use]
    pub fn to_cents(&self) -> i64 {
        (self.0 * Decimal::ONE_HUNDRED)
            .round()
            .to_i64()
            .unwrap_or(Self::MAX_CENTS)
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Amount with exactly two fraction digits and no currency symbol: `3.25`.
    #[must_use]
    pub fn to_amount_string(&self) -> String {
        format!("{:.2}", self.0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_amount_string())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
