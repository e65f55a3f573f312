//! The buyer's cart.
//!
//! Every artwork is one of a kind, so the cart is a set keyed by artwork id:
//! adding an artwork that is already present is a no-op and quantities are
//! always 1. The cart is a plain value; where it is persisted (browser
//! storage, a session) is up to the caller.

use serde::{Deserialize, Serialize};

use crate::{ArtworkId, Price};

/// What the browser knows about an artwork at the time it was added.
///
/// This is a client-side snapshot and is never trusted for settlement: the
/// payment processor's own record is authoritative at reconciliation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtworkSnapshot {
    pub id: ArtworkId,
    pub title: String,
    pub price: Price,
    pub image_url: String,
    #[serde(default)]
    pub dimensions: Option<String>,
    #[serde(default)]
    pub technique: Option<String>,
}

/// One cart entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub artwork: ArtworkSnapshot,
    pub quantity: u32,
}

impl CartItem {
    /// Price of this entry (unit price times quantity).
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.artwork.price.times(self.quantity)
    }
}

/// A set of artworks the buyer intends to purchase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Add an artwork. Returns `false` if it was already in the cart.
    pub fn add(&mut self, artwork: ArtworkSnapshot) -> bool {
        if self.contains(artwork.id) {
            return false;
        }
        self.items.push(CartItem {
            artwork,
            quantity: 1,
        });
        true
    }

    /// Remove an artwork. Returns `false` if it was not in the cart.
    pub fn remove(&mut self, id: ArtworkId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.artwork.id != id);
        self.items.len() != before
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Whether the artwork is already in the cart.
    #[must_use]
    pub fn contains(&self, id: ArtworkId) -> bool {
        self.items.iter().any(|item| item.artwork.id == id)
    }

    /// Cart entries in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Whether the cart has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of all entries.
    #[must_use]
    pub fn total(&self) -> Price {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Number of pieces in the cart.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

impl From<Cart> for Vec<CartItem> {
    fn from(cart: Cart) -> Self {
        cart.items
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use super::*;

    fn snapshot(title: &str, price: &str) -> ArtworkSnapshot {
        ArtworkSnapshot {
            id: ArtworkId::generate(),
            title: title.to_string(),
            price: Price::new(Decimal::from_str(price).unwrap()),
            image_url: format!("https://img.example/{title}.jpg"),
            dimensions: Some("50x70 cm".to_string()),
            technique: None,
        }
    }

    #[test]
    fn test_add_is_set_insert() {
        let mut cart = Cart::new();
        let artwork = snapshot("Západ slnka", "120.00");

        assert!(cart.add(artwork.clone()));
        assert!(!cart.add(artwork));

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.items()[0].quantity, 1);
    }

    #[test]
    fn test_remove() {
        let mut cart = Cart::new();
        let a = snapshot("A", "10");
        let b = snapshot("B", "20");
        cart.add(a.clone());
        cart.add(b.clone());

        assert!(cart.remove(a.id));
        assert!(!cart.remove(a.id));
        assert!(!cart.contains(a.id));
        assert!(cart.contains(b.id));
    }

    #[test]
    fn test_total_and_clear() {
        let mut cart = Cart::new();
        cart.add(snapshot("A", "120.00"));
        cart.add(snapshot("B", "80.50"));
        assert_eq!(cart.total().to_string(), "200.50");
        assert_eq!(cart.item_count(), 2);

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Price::ZERO);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let json = r#"{
            "id": "6f1c2a52-2d5e-4a0e-9c43-2f1f0a8c9b11",
            "title": "Artwork A",
            "price": 120.00,
            "imageUrl": "https://img.example/a.jpg"
        }"#;
        let parsed: ArtworkSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.price.to_minor_units().unwrap(), 12_000);
        assert!(parsed.dimensions.is_none());
    }
}
