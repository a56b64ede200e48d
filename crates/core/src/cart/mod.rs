//! Client-side shopping cart.
//!
//! [`CartStore`] owns the lines and the pickup selection, and writes both
//! through to a [`KeyValueStore`] after every mutation. Persistence is best
//! effort: a failing store is logged and the in-memory cart stays
//! authoritative.
//!
//! ```
//! use sunville_core::cart::{CartStore, MemoryStore, NewCartLine};
//! use sunville_core::Price;
//!
//! let mut cart = CartStore::open(MemoryStore::new());
//! let bun = NewCartLine {
//!     id: "prod_ube".into(),
//!     name: "Ube Bun".into(),
//!     price: Price::parse("3.25").unwrap(),
//!     price_id: "price_ube".into(),
//!     image: "/ube.jpg".into(),
//! };
//! cart.add_item(bun.clone());
//! cart.add_item(bun);
//! assert_eq!(cart.total_items(), 2);
//! ```

mod line;
pub mod storage;

use rust_decimal::Decimal;
use tracing::warn;

pub use line::{CartLine, NewCartLine};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};

use crate::checkout::{CheckoutItem, CheckoutRequest};
use crate::guard::sanitize_pickup_time;
use crate::pickup::PickupSelection;
use line::StoredLine;

/// Storage key for the serialized lines.
pub const CART_KEY: &str = "cart";

/// Storage key for the serialized pickup selection.
pub const PICKUP_TIME_KEY: &str = "pickup-time";

/// The shopping cart.
#[derive(Debug)]
pub struct CartStore<S> {
    storage: S,
    lines: Vec<CartLine>,
    pickup: PickupSelection,
    initialized: bool,
}

impl<S: KeyValueStore> CartStore<S> {
    /// An empty cart that has not read its storage yet. Mutations are kept
    /// in memory only until [`CartStore::hydrate`] runs.
    #[must_use]
    pub const fn new(storage: S) -> Self {
        Self {
            storage,
            lines: Vec::new(),
            pickup: PickupSelection::Immediate,
            initialized: false,
        }
    }

    /// Create a cart and hydrate it from `storage` right away.
    #[must_use]
    pub fn open(storage: S) -> Self {
        let mut cart = Self::new(storage);
        cart.hydrate();
        cart
    }

    /// Load lines and the pickup selection from storage. Runs once; later
    /// calls do nothing.
    ///
    /// Only a scheduled pickup is restored. A stored `ASAP` would be stale by
    /// the next visit, so it is dropped along with anything unparseable.
    pub fn hydrate(&mut self) {
        if self.initialized {
            return;
        }

        match self.storage.get(CART_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<StoredLine>>(&raw) {
                Ok(stored) => self.lines = normalize(stored),
                Err(e) => warn!(error = %e, "Discarding unreadable saved cart"),
            },
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to read saved cart"),
        }

        match self.storage.get(PICKUP_TIME_KEY) {
            Ok(Some(raw)) => match PickupSelection::parse(&raw) {
                Ok(selection @ PickupSelection::Scheduled { .. }) => self.pickup = selection,
                _ => {
                    if let Err(e) = self.storage.remove(PICKUP_TIME_KEY) {
                        warn!(error = %e, "Failed to clear saved pickup time");
                    }
                }
            },
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to read saved pickup time"),
        }

        self.initialized = true;
    }

    /// Whether [`CartStore::hydrate`] has run.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Add one unit of a product.
    pub fn add_item(&mut self, item: NewCartLine) {
        if let Some(line) = self.lines.iter_mut().find(|l| l.id == item.id) {
            line.quantity = line.quantity.saturating_add(1);
        } else {
            self.lines.push(item.with_quantity(1));
        }
        self.persist_lines();
    }

    /// Remove a product. Unknown ids are ignored.
    pub fn remove_item(&mut self, id: &str) {
        let before = self.lines.len();
        self.lines.retain(|l| l.id != id);
        if self.lines.len() != before {
            self.persist_lines();
        }
    }

    /// Set the absolute quantity of a product. Zero or less removes it;
    /// anything above `u32::MAX` is clamped.
    pub fn update_quantity(&mut self, id: &str, quantity: i64) {
        if quantity <= 0 {
            self.remove_item(id);
            return;
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);

        if let Some(line) = self.lines.iter_mut().find(|l| l.id == id) {
            line.quantity = quantity;
            self.persist_lines();
        }
    }

    /// Remove every line. The pickup selection is left alone.
    pub fn clear_cart(&mut self) {
        self.lines.clear();
        self.persist_lines();
    }

    /// Replace the pickup selection.
    pub fn set_pickup_time(&mut self, selection: PickupSelection) {
        self.pickup = selection;
        self.persist_pickup();
    }

    /// Replace the pickup selection from its serialized form. Anything that
    /// is not a well-formed slot becomes `ASAP`.
    pub fn set_pickup_time_str(&mut self, value: &str) {
        let sanitized = sanitize_pickup_time(Some(value));
        let selection = PickupSelection::parse(&sanitized).unwrap_or_default();
        self.set_pickup_time(selection);
    }

    /// Back to `ASAP`.
    pub fn reset_pickup_time(&mut self) {
        self.set_pickup_time(PickupSelection::Immediate);
    }

    /// Call once the payment processor confirms the order: empties the cart
    /// and resets the pickup selection.
    pub fn complete_checkout(&mut self) {
        self.clear_cart();
        self.reset_pickup_time();
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartLine] {
        &self.lines
    }

    /// Total units across all lines.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Sum of `price × quantity` over all lines.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// Current pickup selection.
    #[must_use]
    pub const fn pickup_time(&self) -> PickupSelection {
        self.pickup
    }

    /// Payload for `POST /api/checkout`.
    #[must_use]
    pub fn checkout_request(&self) -> CheckoutRequest {
        CheckoutRequest::Cart {
            items: self
                .lines
                .iter()
                .map(|l| CheckoutItem {
                    price_id: l.price_id.clone(),
                    quantity: i64::from(l.quantity),
                })
                .collect(),
            pickup_time: Some(self.pickup.to_string()),
        }
    }

    /// Borrow the backing store.
    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Give the backing store back.
    #[must_use]
    pub fn into_storage(self) -> S {
        self.storage
    }

    fn persist_lines(&mut self) {
        if !self.initialized {
            return;
        }
        let result = serde_json::to_string(&self.lines)
            .map_err(StorageError::from)
            .and_then(|json| self.storage.set(CART_KEY, &json));
        if let Err(e) = result {
            warn!(error = %e, "Failed to save cart");
        }
    }

    fn persist_pickup(&mut self) {
        if !self.initialized {
            return;
        }
        if let Err(e) = self.storage.set(PICKUP_TIME_KEY, &self.pickup.to_string()) {
            warn!(error = %e, "Failed to save pickup time");
        }
    }
}

/// Drop non-positive quantities and fold duplicate ids into the first line.
fn normalize(stored: Vec<StoredLine>) -> Vec<CartLine> {
    let mut lines: Vec<CartLine> = Vec::with_capacity(stored.len());
    for s in stored {
        let Ok(quantity @ 1..) = u32::try_from(s.quantity) else {
            continue;
        };
        if let Some(line) = lines.iter_mut().find(|l| l.id == s.id) {
            line.quantity = line.quantity.saturating_add(quantity);
            continue;
        }
        lines.push(CartLine {
            id: s.id,
            name: s.name,
            price: s.price,
            price_id: s.price_id,
            image: s.image,
            quantity,
        });
    }
    lines
}
