//! Database operations for the gallery `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `artworks` - One-of-a-kind catalog pieces
//! - `orders` - Orders reconciled from captured payments (unique `payment_reference`)
//! - `order_line_items` - Purchased pieces, cascading with their order
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p galeria-cli -- migrate
//! ```

pub mod artworks;
pub mod orders;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use galeria_core::{Artwork, ArtworkId, Order};

pub use artworks::ArtworkRepository;
pub use orders::OrderRepository;

use crate::models::{NewLineItem, NewOrder, RecordOutcome};
use crate::services::GalleryStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// [`GalleryStore`] backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgGalleryStore {
    pool: PgPool,
}

impl PgGalleryStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl GalleryStore for PgGalleryStore {
    async fn list_artworks(&self) -> Result<Vec<Artwork>, RepositoryError> {
        ArtworkRepository::new(&self.pool).list().await
    }

    async fn latest_available(&self, limit: i64) -> Result<Vec<Artwork>, RepositoryError> {
        ArtworkRepository::new(&self.pool)
            .latest_available(limit)
            .await
    }

    async fn artwork(&self, id: ArtworkId) -> Result<Option<Artwork>, RepositoryError> {
        ArtworkRepository::new(&self.pool).get(id).await
    }

    async fn artwork_by_title(&self, title: &str) -> Result<Option<Artwork>, RepositoryError> {
        ArtworkRepository::new(&self.pool).find_by_title(title).await
    }

    async fn order_by_payment_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        OrderRepository::new(&self.pool)
            .get_by_payment_reference(reference)
            .await
    }

    async fn record_paid_order(
        &self,
        order: NewOrder,
        items: Vec<NewLineItem>,
    ) -> Result<RecordOutcome, RepositoryError> {
        OrderRepository::new(&self.pool)
            .record_paid(order, items)
            .await
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
