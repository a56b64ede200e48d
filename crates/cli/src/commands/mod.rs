//! CLI commands.
//!
//! - `import` - Menu CSV import into the payment processor

pub mod import;
