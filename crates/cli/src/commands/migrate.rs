//! Database migration command.
//!
//! Migrations live in `crates/storefront/migrations/` and are embedded in
//! the binary at compile time. Applied migrations are tracked in
//! `_sqlx_migrations`, so running the command twice is harmless.

use tracing::info;

use super::{CommandError, database_url};

/// Run all pending migrations.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the connection fails,
/// or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let database_url = database_url()?;

    info!("Connecting to database...");
    let pool = galeria_admin::db::create_pool(&database_url).await?;

    info!("Running migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    info!("Migrations complete");
    Ok(())
}
