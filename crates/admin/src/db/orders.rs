//! Read-only order queries for review.

use std::collections::HashMap;

use sqlx::PgPool;

use galeria_core::{Order, OrderId, OrderLineItem};

use super::RepositoryError;

const ORDER_COLUMNS: &str = "id, email, customer_name, shipping_address, phone, total, status, \
                             payment_reference, checkout_session_id, created_at";

const LINE_ITEM_COLUMNS: &str = "id, order_id, artwork_id, title, unit_price, created_at";

/// An order together with its purchased pieces.
#[derive(Debug, Clone)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderLineItem>,
}

/// Repository for reading reconciled orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The newest orders with their line items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if either query fails.
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<OrderWithItems>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<uuid::Uuid> = orders.iter().map(|order| order.id.as_uuid()).collect();
        let items = sqlx::query_as::<_, OrderLineItem>(&format!(
            "SELECT {LINE_ITEM_COLUMNS} FROM order_line_items \
             WHERE order_id = ANY($1) ORDER BY created_at, id"
        ))
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        Ok(group_items(orders, items))
    }
}

/// Attach line items to their orders, keeping the order list's ordering.
fn group_items(orders: Vec<Order>, items: Vec<OrderLineItem>) -> Vec<OrderWithItems> {
    let mut by_order: HashMap<OrderId, Vec<OrderLineItem>> = HashMap::new();
    for item in items {
        by_order.entry(item.order_id).or_default().push(item);
    }

    orders
        .into_iter()
        .map(|order| {
            let items = by_order.remove(&order.id).unwrap_or_default();
            OrderWithItems { order, items }
        })
        .collect()
}
