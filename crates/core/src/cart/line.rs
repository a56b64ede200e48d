//! Cart line items.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::Price;

/// One distinct product in the cart.
///
/// Persisted as `{"id","name","price","priceId","image","quantity"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Product identifier; unique within a cart.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: Price,
    /// Identifier the payment processor charges for this line.
    pub price_id: String,
    /// Image URL.
    pub image: String,
    /// Always at least 1.
    pub quantity: u32,
}

impl CartLine {
    /// `price × quantity`.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.price.amount() * Decimal::from(self.quantity)
    }
}

/// A product being added to the cart. The store owns the quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCartLine {
    /// Product identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: Price,
    /// Identifier the payment processor charges.
    pub price_id: String,
    /// Image URL.
    pub image: String,
}

impl NewCartLine {
    pub(crate) fn with_quantity(self, quantity: u32) -> CartLine {
        CartLine {
            id: self.id,
            name: self.name,
            price: self.price,
            price_id: self.price_id,
            image: self.image,
            quantity,
        }
    }
}

/// Lenient shape used when reading a persisted cart back in. Anything a
/// previous version wrote with a zero or negative quantity still parses and
/// is dropped afterwards.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoredLine {
    pub id: String,
    pub name: String,
    pub price: Price,
    pub price_id: String,
    #[serde(default)]
    pub image: String,
    pub quantity: i64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let line = CartLine {
            id: "prod_1".to_string(),
            name: "Ube Bun".to_string(),
            price: Price::parse("3.25").unwrap(),
            price_id: "price_1".to_string(),
            image: "/ube.jpg".to_string(),
            quantity: 2,
        };
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "prod_1",
                "name": "Ube Bun",
                "price": "3.25",
                "priceId": "price_1",
                "image": "/ube.jpg",
                "quantity": 2
            })
        );
        assert_eq!(line.subtotal(), Decimal::new(650, 2));
    }

    #[test]
    fn test_stored_line_accepts_non_positive_quantity() {
        let stored: StoredLine = serde_json::from_str(
            r#"{"id":"p","name":"n","price":"1.00","priceId":"price_1","quantity":-3}"#,
        )
        .unwrap();
        assert_eq!(stored.quantity, -3);
        assert_eq!(stored.image, "");
    }
}
