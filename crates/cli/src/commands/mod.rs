//! CLI subcommand implementations.

pub mod auth;
pub mod cart;
pub mod orders;
pub mod products;
pub mod wishlist;

use rust_decimal::Decimal;
use tundra_core::{CurrencyCode, Price};

/// Format an amount for terminal display.
pub fn money(amount: Decimal) -> String {
    Price::new(amount, CurrencyCode::USD).display()
}
