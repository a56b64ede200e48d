//! Sunville Core - cart, pickup scheduling and request guard.
//!
//! This crate holds the parts of the bakery that do not need a network:
//! - the client-side [`cart::CartStore`] and its pluggable persistence
//! - [`pickup::PickupSelection`] and the store [`hours`] that bound it
//! - the server-side [`guard`]: rate limiting, constant-time secret
//!   comparison and input sanitizers
//! - the [`checkout`] request schema shared by the cart and the storefront API
//!
//! # Architecture
//!
//! No HTTP clients and no async runtime. The only I/O is the optional
//! file-backed cart storage in [`cart::storage`].
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for processor IDs, prices and emails

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod guard;
pub mod hours;
pub mod pickup;
pub mod types;

pub use cart::{CartLine, CartStore, NewCartLine};
pub use checkout::{CheckoutError, CheckoutItem, CheckoutRequest, ValidatedCheckout};
pub use pickup::PickupSelection;
pub use types::*;
