//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::{StorageBackend, StorefrontConfig};
use crate::db::{PgImageRepository, PgProductRepository, PgUserRepository};
use crate::services::{CatalogService, UserService};
use crate::storage::{LocalObjectStore, ObjectStore, ObjectStoreError, SupabaseObjectStore};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the configuration and the catalog and user services.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: CatalogService,
    users: UserService,
}

impl AppState {
    /// Create application state backed by `PostgreSQL` and the configured
    /// object store.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if the object store client cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, ObjectStoreError> {
        let storage = build_object_store(&config)?;

        let catalog = CatalogService::new(
            Arc::new(PgProductRepository::new(pool.clone())),
            Arc::new(PgImageRepository::new(pool.clone())),
            storage,
        );
        let users = UserService::new(Arc::new(PgUserRepository::new(pool)));

        Ok(Self::from_parts(config, catalog, users))
    }

    /// Assemble state from already-built services.
    #[must_use]
    pub fn from_parts(config: StorefrontConfig, catalog: CatalogService, users: UserService) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                users,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the catalog service.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    /// Get a reference to the user service.
    #[must_use]
    pub fn users(&self) -> &UserService {
        &self.inner.users
    }
}

/// Build the object store selected by configuration.
fn build_object_store(config: &StorefrontConfig) -> Result<Arc<dyn ObjectStore>, ObjectStoreError> {
    let bucket = config.storage.bucket.clone();
    Ok(match &config.storage.backend {
        StorageBackend::Local { media_dir } => Arc::new(LocalObjectStore::new(
            media_dir.clone(),
            bucket,
            &config.base_url,
        )),
        StorageBackend::Supabase { url, service_key } => {
            Arc::new(SupabaseObjectStore::new(url, service_key, bucket)?)
        }
    })
}
