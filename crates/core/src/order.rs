//! Reconciled orders.
//!
//! Orders are only ever created from a captured payment; they and their line
//! items are immutable afterwards.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{ArtworkId, Email, LineItemId, OrderId, OrderStatus, Price};

/// A reconciled order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Order {
    pub id: OrderId,
    pub email: Email,
    pub customer_name: String,
    /// Flattened shipping address as the buyer typed it.
    pub shipping_address: String,
    pub phone: Option<String>,
    /// Processor-reported total.
    pub total: Price,
    pub status: OrderStatus,
    /// Payment-intent id (or session id); unique per order.
    pub payment_reference: String,
    pub checkout_session_id: String,
    pub created_at: DateTime<Utc>,
}

/// One purchased piece belonging to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct OrderLineItem {
    pub id: LineItemId,
    pub order_id: OrderId,
    /// `None` when the purchased product could not be matched to an artwork.
    pub artwork_id: Option<ArtworkId>,
    /// Title at the time of sale.
    pub title: String,
    /// Unit price at the time of sale.
    pub unit_price: Price,
    pub created_at: DateTime<Utc>,
}

/// Sum of line-item unit prices.
#[must_use]
pub fn line_items_total(items: &[OrderLineItem]) -> Price {
    items.iter().map(|item| item.unit_price).sum()
}
