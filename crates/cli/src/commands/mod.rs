//! CLI subcommands.

pub mod migrate;
pub mod seed;

use secrecy::SecretString;
use thiserror::Error;

/// Errors shared by database-backed commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Neither database URL variable is set.
    #[error("Missing environment variable: STOREFRONT_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Load `.env` and read the storefront database URL.
fn database_url() -> Result<SecretString, CommandError> {
    let _ = dotenvy::dotenv();
    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingDatabaseUrl)
}
