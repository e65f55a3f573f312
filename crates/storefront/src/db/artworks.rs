//! Artwork queries used by the storefront.

use sqlx::PgPool;

use galeria_core::{Artwork, ArtworkId};

use super::RepositoryError;

const ARTWORK_COLUMNS: &str = "id, title, description, price, image_url, dimensions, \
                               technique, year, available, created_at";

/// Read-only access to the catalog.
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

    /// Newest artworks that are still for sale.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest_available(&self, limit: i64) -> Result<Vec<Artwork>, RepositoryError> {
        let rows = sqlx::query_as::<_, Artwork>(&format!(
            "SELECT {ARTWORK_COLUMNS} FROM artworks WHERE available \
             ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Get an artwork by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ArtworkId) -> Result<Option<Artwork>, RepositoryError> {
        let row = sqlx::query_as::<_, Artwork>(&format!(
            "SELECT {ARTWORK_COLUMNS} FROM artworks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Find an artwork by exact title.
    ///
    /// Titles are not unique; when several match, available artworks win over
    /// sold ones, then the newest.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_title(&self, title: &str) -> Result<Option<Artwork>, RepositoryError> {
        let row = sqlx::query_as::<_, Artwork>(&format!(
            "SELECT {ARTWORK_COLUMNS} FROM artworks WHERE title = $1 \
             ORDER BY available DESC, created_at DESC LIMIT 1"
        ))
        .bind(title)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }
}
