//! Order persistence.
//!
//! The reconciler's write path: one transaction inserts the order, its line
//! items and the availability flips, keyed by the payment reference.

use std::collections::HashSet;

use sqlx::PgPool;

use galeria_core::{Order, OrderLineItem, OrderStatus};

use super::RepositoryError;
use crate::models::{NewLineItem, NewOrder, RecordOutcome, RecordedOrder};

const ORDER_COLUMNS: &str = "id, email, customer_name, shipping_address, phone, total, status, \
                             payment_reference, checkout_session_id, created_at";

/// Repository for orders and their line items.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an order by its payment reference.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_payment_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE payment_reference = $1"
        ))
        .bind(reference)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Atomically record a paid order.
    ///
    /// Inserts the order, every line item, and flips each referenced artwork
    /// to unavailable with a conditional update. An artwork that was already
    /// unavailable is reported in [`RecordedOrder::double_sold`] and the order
    /// is stored as [`OrderStatus::NeedsReview`].
    ///
    /// If an order with the same payment reference exists, nothing is written
    /// and [`RecordOutcome::AlreadyRecorded`] is returned.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails; the
    /// transaction is rolled back and no partial order is visible.
    pub async fn record_paid(
        &self,
        new_order: NewOrder,
        items: Vec<NewLineItem>,
    ) -> Result<RecordOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_as::<_, Order>(&format!(
            r"
            INSERT INTO orders (email, customer_name, shipping_address, phone, total, status,
                                payment_reference, checkout_session_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (payment_reference) DO NOTHING
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(&new_order.email)
        .bind(&new_order.customer_name)
        .bind(&new_order.shipping_address)
        .bind(&new_order.phone)
        .bind(new_order.total)
        .bind(new_order.status)
        .bind(&new_order.payment_reference)
        .bind(&new_order.checkout_session_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut order) = inserted else {
            tx.rollback().await?;
            let existing = self
                .get_by_payment_reference(&new_order.payment_reference)
                .await?
                .ok_or(RepositoryError::NotFound)?;
            return Ok(RecordOutcome::AlreadyRecorded(existing.id));
        };

        let mut line_items = Vec::with_capacity(items.len());
        let mut flipped = HashSet::new();
        let mut double_sold = Vec::new();

        for item in items {
            let line_item = sqlx::query_as::<_, OrderLineItem>(
                r"
                INSERT INTO order_line_items (order_id, artwork_id, title, unit_price)
                VALUES ($1, $2, $3, $4)
                RETURNING id, order_id, artwork_id, title, unit_price, created_at
                ",
            )
            .bind(order.id)
            .bind(item.artwork_id)
            .bind(&item.title)
            .bind(item.unit_price)
            .fetch_one(&mut *tx)
            .await?;
            line_items.push(line_item);

            let Some(artwork_id) = item.artwork_id else {
                continue;
            };
            if !flipped.insert(artwork_id) {
                continue;
            }

            let result =
                sqlx::query("UPDATE artworks SET available = FALSE WHERE id = $1 AND available")
                    .bind(artwork_id)
                    .execute(&mut *tx)
                    .await?;
            if result.rows_affected() == 0 {
                double_sold.push(artwork_id);
            }
        }

        if !double_sold.is_empty() && order.status != OrderStatus::NeedsReview {
            sqlx::query("UPDATE orders SET status = $1 WHERE id = $2")
                .bind(OrderStatus::NeedsReview)
                .bind(order.id)
                .execute(&mut *tx)
                .await?;
            order.status = OrderStatus::NeedsReview;
        }

        tx.commit().await?;

        Ok(RecordOutcome::Recorded(RecordedOrder {
            order,
            line_items,
            double_sold,
        }))
    }
}
