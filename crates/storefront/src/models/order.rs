//! Order write models used by the reconciler.

use galeria_core::{ArtworkId, Email, Order, OrderLineItem, OrderId, OrderStatus, Price};

/// Order fields assembled by the reconciler before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub email: Email,
    pub customer_name: String,
    pub shipping_address: String,
    pub phone: Option<String>,
    /// Processor-reported total.
    pub total: Price,
    /// `NeedsReview` when reconciliation already found a problem.
    pub status: OrderStatus,
    pub payment_reference: String,
    pub checkout_session_id: String,
}

/// A line item to persist with a [`NewOrder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLineItem {
    pub artwork_id: Option<ArtworkId>,
    pub title: String,
    pub unit_price: Price,
}

/// An order written by [`GalleryStore::record_paid_order`](crate::services::GalleryStore::record_paid_order).
#[derive(Debug, Clone)]
pub struct RecordedOrder {
    pub order: Order,
    pub line_items: Vec<OrderLineItem>,
    /// Matched artworks that were already sold when this order tried to
    /// mark them unavailable.
    pub double_sold: Vec<ArtworkId>,
}

/// Result of an atomic order write.
#[derive(Debug, Clone)]
pub enum RecordOutcome {
    /// The order and all its line items were written.
    Recorded(RecordedOrder),
    /// An order with the same payment reference already exists; nothing was written.
    AlreadyRecorded(OrderId),
}
