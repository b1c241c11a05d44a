//! Database migration command.
//!
//! Applies `crates/storefront/migrations/` to the database named by
//! `STOREFRONT_DATABASE_URL` (falling back to `DATABASE_URL`). The
//! migrations are embedded at compile time.

use tracing::info;

use virtual_craft_storefront::db;

use super::{CommandError, database_url};

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns an error if the URL is missing, the database is unreachable,
/// or a migration fails.
pub async fn storefront() -> Result<(), CommandError> {
    let database_url = database_url()?;

    info!("Connecting to storefront database...");
    let pool = db::create_pool(&database_url).await?;

    info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    info!("Storefront migrations complete");
    Ok(())
}
