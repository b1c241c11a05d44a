//! Integration test harness for Virtual Craft.
//!
//! # Running Tests
//!
//! ```bash
//! # Point at a disposable database
//! export TEST_DATABASE_URL=postgres://localhost/virtual_craft_test
//!
//! # Database-backed service tests
//! cargo test -p virtual-craft-integration-tests -- --ignored
//! ```
//!
//! HTTP tests additionally need a running storefront at `STOREFRONT_BASE_URL`
//! (default `http://localhost:3000`).

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use secrecy::SecretString;
use sqlx::PgPool;
use tempfile::TempDir;

use virtual_craft_core::{NewProduct, Price, Product};
use virtual_craft_storefront::db::{
    self, PgImageRepository, PgProductRepository, PgUserRepository,
};
use virtual_craft_storefront::services::{CatalogService, UploadedImage, UserService};
use virtual_craft_storefront::storage::LocalObjectStore;

pub const TEST_BUCKET: &str = "product-images";

/// Services over a migrated database and a throwaway media directory.
pub struct TestContext {
    pub pool: PgPool,
    pub catalog: CatalogService,
    pub users: UserService,
    pub media: TempDir,
}

impl TestContext {
    /// Connect, migrate, and provision a local image container.
    ///
    /// # Panics
    ///
    /// Panics if the database is unreachable or migrations fail.
    pub async fn new() -> Self {
        let url = std::env::var("TEST_DATABASE_URL")
            .or_else(|_| std::env::var("STOREFRONT_DATABASE_URL"))
            .expect("TEST_DATABASE_URL must be set");
        let pool = db::create_pool(&SecretString::from(url))
            .await
            .expect("Failed to connect to test database");

        sqlx::migrate!("../storefront/migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        let media = tempfile::tempdir().expect("Failed to create media dir");
        std::fs::create_dir_all(media.path().join(TEST_BUCKET)).expect("Failed to create bucket");

        let storage = Arc::new(LocalObjectStore::new(
            media.path(),
            TEST_BUCKET,
            "http://localhost:3000",
        ));
        let catalog = CatalogService::new(
            Arc::new(PgProductRepository::new(pool.clone())),
            Arc::new(PgImageRepository::new(pool.clone())),
            storage,
        );
        let users = UserService::new(Arc::new(PgUserRepository::new(pool.clone())));

        Self {
            pool,
            catalog,
            users,
            media,
        }
    }

    /// Create an active product with a unique name.
    ///
    /// # Panics
    ///
    /// Panics if the insert fails.
    pub async fn product(&self, label: &str) -> Product {
        self.catalog
            .create(NewProduct {
                name: Some(unique(label)),
                description: None,
                price: Some(Price::from_cents(1999)),
                active: Some(true),
            })
            .await
            .expect("Failed to create product")
    }
}

/// A name that will not collide across test runs.
#[must_use]
pub fn unique(label: &str) -> String {
    format!("{label}-{}", virtual_craft_core::ProductId::generate())
}

/// A small fake JPEG upload.
#[must_use]
pub fn jpeg(name: &str) -> UploadedImage {
    UploadedImage {
        bytes: vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3],
        filename: name.to_string(),
        content_type: "image/jpeg".to_string(),
    }
}

/// Base URL of a running storefront for HTTP tests.
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}
