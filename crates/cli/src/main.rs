//! Virtual Craft CLI - Database migrations and demo data.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! vc-cli migrate
//!
//! # Insert the demo catalog, skipping products that already exist
//! vc-cli seed
//!
//! # Insert the demo catalog, overwriting products with the same name
//! vc-cli seed --replace
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "vc-cli")]
#[command(author, version, about = "Virtual Craft CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Insert the demo catalog with its customization options
    Seed {
        /// Overwrite products whose name already exists
        #[arg(long)]
        replace: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Seed { replace } => {
            let report = commands::seed::demo_catalog(replace).await?;
            tracing::info!(
                inserted = report.inserted,
                replaced = report.replaced,
                skipped = report.skipped,
                "Seeding complete"
            );
        }
    }
    Ok(())
}
