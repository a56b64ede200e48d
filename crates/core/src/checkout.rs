//! Checkout request schema.
//!
//! The storefront accepts two request shapes on `POST /api/checkout`: the
//! whole cart, or a single "buy now" product. Both are validated into a
//! [`ValidatedCheckout`] before the payment processor sees them.

use serde::{Deserialize, Serialize};

use crate::guard::sanitize_pickup_time;
use crate::types::{IdError, PriceId};

/// Most distinct lines in one checkout.
pub const MAX_LINES: usize = 50;

/// Most units of one line.
pub const MAX_QUANTITY: i64 = 99;

/// Longest accepted product name on a buy-now request.
pub const MAX_PRODUCT_NAME_LENGTH: usize = 200;

/// One `{priceId, quantity}` entry of a cart checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    /// Price to charge.
    pub price_id: String,
    /// Requested units.
    pub quantity: i64,
}

/// Body of `POST /api/checkout`.
///
/// A body with `items` is a cart checkout; a body with a top-level `priceId`
/// is a single-item purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CheckoutRequest {
    /// Whole-cart checkout.
    #[serde(rename_all = "camelCase")]
    Cart {
        /// Lines to charge.
        items: Vec<CheckoutItem>,
        /// Serialized pickup selection.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pickup_time: Option<String>,
    },
    /// One unit of one product.
    #[serde(rename_all = "camelCase")]
    BuyNow {
        /// Price to charge.
        price_id: String,
        /// Shown in the order notification.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        product_name: Option<String>,
        /// Serialized pickup selection.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pickup_time: Option<String>,
    },
}

/// Errors raised while validating a [`CheckoutRequest`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// No lines at all.
    #[error("Cart is empty")]
    Empty,
    /// More than [`MAX_LINES`] lines.
    #[error("Too many items in cart (max {max})")]
    TooManyLines {
        /// Maximum allowed lines.
        max: usize,
    },
    /// A quantity outside `1..=MAX_QUANTITY`.
    #[error("Invalid quantity (must be between 1 and {max})")]
    InvalidQuantity {
        /// Maximum allowed quantity.
        max: i64,
    },
    /// A malformed price identifier.
    #[error("Invalid price ID: {0}")]
    InvalidPriceId(#[from] IdError),
    /// Product name over [`MAX_PRODUCT_NAME_LENGTH`] characters.
    #[error("Product name is too long (max {max} characters)")]
    ProductNameTooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

/// A line the payment processor will charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    /// Validated price identifier.
    pub price_id: PriceId,
    /// Units, `1..=MAX_QUANTITY`.
    pub quantity: u32,
}

/// A checkout request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCheckout {
    /// Lines to charge, in request order.
    pub line_items: Vec<LineItem>,
    /// Sanitized pickup time (`ASAP` or a scheduled slot).
    pub pickup_time: String,
    /// Product name for single-item purchases.
    pub product_name: Option<String>,
}

impl CheckoutRequest {
    /// Validate the request.
    ///
    /// # Errors
    ///
    /// Returns the first rule the request breaks.
    pub fn validate(&self) -> Result<ValidatedCheckout, CheckoutError> {
        match self {
            Self::Cart { items, pickup_time } => {
                if items.is_empty() {
                    return Err(CheckoutError::Empty);
                }
                if items.len() > MAX_LINES {
                    return Err(CheckoutError::TooManyLines { max: MAX_LINES });
                }

                let line_items = items
                    .iter()
                    .map(|item| line_item(&item.price_id, item.quantity))
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(ValidatedCheckout {
                    line_items,
                    pickup_time: sanitize_pickup_time(pickup_time.as_deref()),
                    product_name: None,
                })
            }
            Self::BuyNow {
                price_id,
                product_name,
                pickup_time,
            } => {
                let product_name = product_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|name| !name.is_empty());
                if product_name.is_some_and(|name| name.chars().count() > MAX_PRODUCT_NAME_LENGTH) {
                    return Err(CheckoutError::ProductNameTooLong {
                        max: MAX_PRODUCT_NAME_LENGTH,
                    });
                }

                Ok(ValidatedCheckout {
                    line_items: vec![line_item(price_id, 1)?],
                    pickup_time: sanitize_pickup_time(pickup_time.as_deref()),
                    product_name: product_name.map(str::to_string),
                })
            }
        }
    }
}

fn line_item(price_id: &str, quantity: i64) -> Result<LineItem, CheckoutError> {
    let quantity = u32::try_from(quantity)
        .ok()
        .filter(|q| (1..=MAX_QUANTITY).contains(&i64::from(*q)))
        .ok_or(CheckoutError::InvalidQuantity { max: MAX_QUANTITY })?;

    Ok(LineItem {
        price_id: PriceId::parse(price_id)?,
        quantity,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(price_id: &str, quantity: i64) -> CheckoutItem {
        CheckoutItem {
            price_id: price_id.to_string(),
            quantity,
        }
    }

    #[test]
    fn test_deserialize_cart_shape() {
        let req: CheckoutRequest = serde_json::from_str(
            r#"{"items":[{"priceId":"price_1","quantity":2}],"pickupTime":"ASAP"}"#,
        )
        .unwrap();
        assert_eq!(
            req,
            CheckoutRequest::Cart {
                items: vec![item("price_1", 2)],
                pickup_time: Some("ASAP".to_string()),
            }
        );
    }

    #[test]
    fn test_deserialize_buy_now_shape() {
        let req: CheckoutRequest =
            serde_json::from_str(r#"{"priceId":"price_9","productName":"Ube Bun"}"#).unwrap();
        assert!(matches!(req, CheckoutRequest::BuyNow { .. }));
        assert!(serde_json::from_str::<CheckoutRequest>("{}").is_err());
    }

    #[test]
    fn test_validate_cart() {
        let req = CheckoutRequest::Cart {
            items: vec![item("price_1", 2), item("price_2", 99)],
            pickup_time: Some("2025-03-01 at 02:00 PM".to_string()),
        };
        let checkout = req.validate().unwrap();
        assert_eq!(checkout.line_items.len(), 2);
        assert_eq!(checkout.line_items[1].quantity, 99);
        assert_eq!(checkout.pickup_time, "2025-03-01 at 02:00 PM");
        assert_eq!(checkout.product_name, None);
    }

    #[test]
    fn test_validate_rejects_bad_lines() {
        let empty = CheckoutRequest::Cart {
            items: vec![],
            pickup_time: None,
        };
        assert_eq!(empty.validate(), Err(CheckoutError::Empty));

        let too_many = CheckoutRequest::Cart {
            items: (0..=MAX_LINES).map(|_| item("price_1", 1)).collect(),
            pickup_time: None,
        };
        assert_eq!(
            too_many.validate(),
            Err(CheckoutError::TooManyLines { max: MAX_LINES })
        );

        for quantity in [0, -1, 100] {
            let req = CheckoutRequest::Cart {
                items: vec![item("price_1", quantity)],
                pickup_time: None,
            };
            assert_eq!(
                req.validate(),
                Err(CheckoutError::InvalidQuantity { max: MAX_QUANTITY })
            );
        }

        let bad_price = CheckoutRequest::Cart {
            items: vec![item("prod_1", 1)],
            pickup_time: None,
        };
        assert!(matches!(
            bad_price.validate(),
            Err(CheckoutError::InvalidPriceId(_))
        ));
    }

    #[test]
    fn test_validate_buy_now_sanitizes_pickup() {
        let req = CheckoutRequest::BuyNow {
            price_id: "price_7".to_string(),
            product_name: Some("  Pandesal  ".to_string()),
            pickup_time: Some("tomorrow-ish".to_string()),
        };
        let checkout = req.validate().unwrap();
        assert_eq!(checkout.line_items[0].quantity, 1);
        assert_eq!(checkout.pickup_time, "ASAP");
        assert_eq!(checkout.product_name.as_deref(), Some("Pandesal"));
    }

    #[test]
    fn test_validate_buy_now_name_length() {
        let req = CheckoutRequest::BuyNow {
            price_id: "price_7".to_string(),
            product_name: Some("x".repeat(MAX_PRODUCT_NAME_LENGTH + 1)),
            pickup_time: None,
        };
        assert_eq!(
            req.validate(),
            Err(CheckoutError::ProductNameTooLong {
                max: MAX_PRODUCT_NAME_LENGTH
            })
        );
    }
}
