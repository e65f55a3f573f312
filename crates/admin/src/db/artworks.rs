//! Artwork CRUD.

use sqlx::PgPool;
use tracing::instrument;

use galeria_core::{Artwork, ArtworkId};

use super::RepositoryError;
use crate::models::ArtworkInput;

const ARTWORK_COLUMNS: &str = "id, title, description, price, image_url, dimensions, \
                               technique, year, available, created_at";

/// Repository for catalog artworks.
pub struct ArtworkRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ArtworkRepository<'a> {
    /// Create a new artwork repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All artworks, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Artwork>, RepositoryError> {
        let rows = sqlx::query_as::<_, Artwork>(&format!(
            "SELECT {ARTWORK_COLUMNS} FROM artworks ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Get an artwork by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no artwork has this id.
    pub async fn get(&self, id: ArtworkId) -> Result<Artwork, RepositoryError> {
        sqlx::query_as::<_, Artwork>(&format!(
            "SELECT {ARTWORK_COLUMNS} FROM artworks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Insert a new artwork.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create(
        &self,
        input: &ArtworkInput,
        image_url: &str,
    ) -> Result<Artwork, RepositoryError> {
        let row = sqlx::query_as::<_, Artwork>(&format!(
            r"
            INSERT INTO artworks (title, description, price, image_url, dimensions,
                                  technique, year, available)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ARTWORK_COLUMNS}
            "
        ))
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.price)
        .bind(image_url)
        .bind(&input.dimensions)
        .bind(&input.technique)
        .bind(input.year)
        .bind(input.available)
        .fetch_one(self.pool)
        .await?;
        Ok(row)
    }

    /// Replace every editable field of an artwork.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the artwork no longer exists.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn update(
        &self,
        id: ArtworkId,
        input: &ArtworkInput,
        image_url: &str,
    ) -> Result<Artwork, RepositoryError> {
        sqlx::query_as::<_, Artwork>(&format!(
            r"
            UPDATE artworks
            SET title = $2, description = $3, price = $4, image_url = $5,
                dimensions = $6, technique = $7, year = $8, available = $9
            WHERE id = $1
            RETURNING {ARTWORK_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.price)
        .bind(image_url)
        .bind(&input.dimensions)
        .bind(&input.technique)
        .bind(input.year)
        .bind(input.available)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete an artwork and return it, so its image can be cleaned up.
    ///
    /// Sold pieces keep their order line items; the reference is nulled.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the artwork does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ArtworkId) -> Result<Artwork, RepositoryError> {
        sqlx::query_as::<_, Artwork>(&format!(
            "DELETE FROM artworks WHERE id = $1 RETURNING {ARTWORK_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
