//! Catalog artwork.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{ArtworkId, ArtworkSnapshot, Price};

/// A one-of-a-kind artwork listed in the gallery.
///
/// There is no stock count: `available` flips to `false` once the piece is
/// sold and never flips back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Artwork {
    pub id: ArtworkId,
    pub title: String,
    pub description: Option<String>,
    pub price: Price,
    pub image_url: String,
    pub dimensions: Option<String>,
    pub technique: Option<String>,
    pub year: Option<i32>,
    pub available: bool,
    pub created_at: DateTime<Utc>,
}

impl Artwork {
    /// The cart's view of this artwork.
    #[must_use]
    pub fn snapshot(&self) -> ArtworkSnapshot {
        ArtworkSnapshot {
            id: self.id,
            title: self.title.clone(),
            price: self.price,
            image_url: self.image_url.clone(),
            dimensions: self.dimensions.clone(),
            technique: self.technique.clone(),
        }
    }

    /// `"<dimensions> - <technique>"` with missing parts left out.
    #[must_use]
    pub fn details(&self) -> String {
        details_line(self.dimensions.as_deref(), self.technique.as_deref())
    }
}

/// Join dimensions and technique the way product descriptions show them.
#[must_use]
pub fn details_line(dimensions: Option<&str>, technique: Option<&str>) -> String {
    let parts: Vec<&str> = [dimensions, technique]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    parts.join(" - ")
}
