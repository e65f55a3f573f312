//! Galéria Umenia CLI - database migrations and sample data.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! galeria-cli migrate
//!
//! # Insert sample artworks into an empty catalog
//! galeria-cli seed
//!
//! # Insert them even if the catalog already has artworks
//! galeria-cli seed --force
//! ```
//!
//! Both commands read `DATABASE_URL` (or `STOREFRONT_DATABASE_URL`), loading
//! `.env` if present.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "galeria-cli")]
#[command(author, version, about = "Galéria Umenia CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Insert sample artworks
    Seed {
        /// Seed even when artworks already exist
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await,
        Commands::Seed { force } => commands::seed::run(force).await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_seed_force() {
        let cli = Cli::try_parse_from(["galeria-cli", "seed", "--force"]).unwrap();
        assert!(matches!(cli.command, Commands::Seed { force: true }));
    }
}
