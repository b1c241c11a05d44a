//! Database operations for the storefront record store.
//!
//! # Schema: `storefront`
//!
//! ## Tables
//!
//! - `users` - Profiles created from external logins, keyed by email
//! - `products` - Catalog entries
//! - `product_images` - Per-product galleries (one primary per product)
//! - `customization_types` / `customization_options` - Selectable variations
//! - `product_customizations` - Which customization types a product offers
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p vc-cli -- migrate
//! ```
//!
//! Services depend on the repository traits below rather than on
//! [`PgPool`], so they can run against in-memory implementations in tests.

pub mod images;
pub mod products;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use virtual_craft_core::{
    Email, ImageId, Price, Product, ProductDetails, ProductId, ProductImage, ProductPatch,
    ProductWithImages, User, UserId, UserPatch,
};

pub use images::PgImageRepository;
pub use products::PgProductRepository;
pub use users::PgUserRepository;

/// Postgres SQLSTATE for an exclusion constraint violation.
const EXCLUSION_VIOLATION: &str = "23P01";

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A uniqueness or exclusion constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a write error, turning constraint violations into [`RepositoryError::Conflict`].
    pub(crate) fn from_write(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && (db_err.is_unique_violation()
                || db_err.code().as_deref() == Some(EXCLUSION_VIOLATION))
        {
            return Self::Conflict(what.to_owned());
        }
        Self::Database(err)
    }
}

/// Validated fields for a new product row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub name: String,
    pub description: Option<String>,
    pub price: Price,
    pub active: bool,
}

/// Fields for a new image row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    pub product_id: ProductId,
    pub storage_path: String,
    pub public_url: String,
    pub display_order: i32,
    pub is_primary: bool,
}

/// Product rows and their customizations.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Cheap round-trip used by the readiness probe.
    async fn ping(&self) -> Result<(), RepositoryError>;

    /// Active products ordered by name, each with its ordered gallery.
    async fn list_active(&self) -> Result<Vec<ProductWithImages>, RepositoryError>;

    /// A product with images and customizations, regardless of `active`.
    async fn get_details(&self, id: ProductId) -> Result<Option<ProductDetails>, RepositoryError>;

    async fn exists(&self, id: ProductId) -> Result<bool, RepositoryError>;

    async fn create(&self, draft: &ProductDraft) -> Result<Product, RepositoryError>;

    /// Apply a partial update and refresh `updated_at`. `None` when no row matches.
    async fn update(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, RepositoryError>;

    /// Delete a product; images and customization links cascade.
    /// Returns whether a row was removed.
    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError>;
}

/// Product image rows.
#[async_trait]
pub trait ImageRepository: Send + Sync {
    /// Images of a product ordered by `display_order`, then `created_at`.
    async fn list(&self, product_id: ProductId) -> Result<Vec<ProductImage>, RepositoryError>;

    async fn get(&self, id: ImageId) -> Result<Option<ProductImage>, RepositoryError>;

    async fn count(&self, product_id: ProductId) -> Result<i64, RepositoryError>;

    /// Insert a row. A second primary for the same product is a
    /// [`RepositoryError::Conflict`].
    async fn insert(&self, image: &NewImage) -> Result<ProductImage, RepositoryError>;

    async fn set_display_order(
        &self,
        id: ImageId,
        display_order: i32,
    ) -> Result<Option<ProductImage>, RepositoryError>;

    /// Make `id` the only primary image of its product in one statement.
    async fn promote(&self, id: ImageId) -> Result<Option<ProductImage>, RepositoryError>;

    async fn delete(&self, id: ImageId) -> Result<bool, RepositoryError>;

    /// Flag the lowest-ordered image of a product as primary, unless the
    /// product already has one or no images remain.
    async fn elect_primary(
        &self,
        product_id: ProductId,
    ) -> Result<Option<ProductImage>, RepositoryError>;

    /// Set `display_order = index` for each id, restricted to `product_id`.
    /// Returns the number of rows updated.
    async fn reorder(&self, product_id: ProductId, ids: &[ImageId])
    -> Result<u64, RepositoryError>;
}

/// User profile rows.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Insert a user or refresh `name`, `picture` and `last_login` of the
    /// existing row with the same email. Never touches `is_admin`.
    async fn upsert_from_identity(
        &self,
        email: &Email,
        name: &str,
        picture: Option<&str>,
    ) -> Result<User, RepositoryError>;

    async fn update(&self, id: UserId, patch: &UserPatch) -> Result<Option<User>, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
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
