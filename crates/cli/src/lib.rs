//! Sunville CLI library.
//!
//! Command implementations live here so they can be driven from tests with a
//! fake payment processor; `main.rs` only parses arguments.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod commands;
