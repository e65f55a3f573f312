//! Seed the catalog with sample artworks.
//!
//! Intended for local development and demo deployments. The catalog is left
//! alone when it already has artworks unless `--force` is given.

use std::str::FromStr;

use rust_decimal::Decimal;
use tracing::info;

use galeria_admin::db::{self, ArtworkRepository};
use galeria_admin::models::ArtworkInput;
use galeria_core::Price;

use super::{CommandError, database_url};

/// A sample listing: title, price, dimensions, technique, year, image.
struct Sample {
    title: &'static str,
    description: &'static str,
    price: &'static str,
    dimensions: &'static str,
    technique: &'static str,
    year: i32,
    image_url: &'static str,
}

const SAMPLES: &[Sample] = &[
    Sample {
        title: "Západ slnka nad Tatrami",
        description: "Večerné svetlo nad štítmi Vysokých Tatier.",
        price: "120.00",
        dimensions: "50x70 cm",
        technique: "olej na plátne",
        year: 2023,
        image_url: "https://images.unsplash.com/photo-1579783902614-a3fb3927b6a5",
    },
    Sample {
        title: "Ranná hmla",
        description: "Krajina pri Dunaji v prvých lúčoch.",
        price: "85.50",
        dimensions: "40x50 cm",
        technique: "akvarel",
        year: 2022,
        image_url: "https://images.unsplash.com/photo-1578301978693-85fa9c0320b9",
    },
    Sample {
        title: "Staré mesto",
        description: "Uličky bratislavského Starého mesta.",
        price: "240.00",
        dimensions: "60x80 cm",
        technique: "akryl na plátne",
        year: 2021,
        image_url: "https://images.unsplash.com/photo-1577083552431-6e5fd01988ec",
    },
    Sample {
        title: "Kompozícia v modrej",
        description: "Abstraktná štúdia farby a rytmu.",
        price: "310.00",
        dimensions: "100x100 cm",
        technique: "zmiešaná technika",
        year: 2024,
        image_url: "https://images.unsplash.com/photo-1549490349-8643362247b5",
    },
    Sample {
        title: "Zátišie s jablkami",
        description: "Klasické zátišie v teplých tónoch.",
        price: "95.00",
        dimensions: "30x40 cm",
        technique: "olej na doske",
        year: 2020,
        image_url: "https://images.unsplash.com/photo-1578926375605-eaf7559b1458",
    },
];

impl Sample {
    fn input(&self) -> Result<ArtworkInput, CommandError> {
        let amount = Decimal::from_str(self.price)
            .map_err(|e| CommandError::SeedData(format!("{}: {e}", self.title)))?;
        let price = Price::listing(amount)
            .map_err(|e| CommandError::SeedData(format!("{}: {e}", self.title)))?;

        Ok(ArtworkInput {
            title: self.title.to_string(),
            description: Some(self.description.to_string()),
            price,
            dimensions: Some(self.dimensions.to_string()),
            technique: Some(self.technique.to_string()),
            year: Some(self.year),
            available: true,
        })
    }
}

/// Insert the sample artworks.
///
/// # Errors
///
/// Returns an error if the database is unreachable or an insert fails.
pub async fn run(force: bool) -> Result<(), CommandError> {
    let database_url = database_url()?;
    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM artworks")
        .fetch_one(&pool)
        .await?;
    if existing > 0 && !force {
        info!(existing, "Catalog already has artworks, skipping (use --force to seed anyway)");
        return Ok(());
    }

    let repo = ArtworkRepository::new(&pool);
    for sample in SAMPLES {
        let artwork = repo.create(&sample.input()?, sample.image_url).await?;
        info!(artwork_id = %artwork.id, title = %artwork.title, "Seeded artwork");
    }

    info!(count = SAMPLES.len(), "Seeding complete");
    Ok(())
}
