//! Session keys.

/// Key under which the buyer's [`Cart`](galeria_core::Cart) is stored.
pub const CART: &str = "cart";
