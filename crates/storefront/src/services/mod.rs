//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `catalog` - Products, image galleries, primary-image and ordering rules
//! - `users` - User profiles created from external logins
//!
//! Services own their repositories behind trait objects and are cheap to
//! clone into handlers.

pub mod catalog;
pub mod users;

pub use catalog::{CatalogError, CatalogService, UploadedImage};
pub use users::{UserError, UserService};

use thiserror::Error;

use crate::db::RepositoryError;
use crate::storage::ObjectStoreError;

/// A failure in one of the backing stores.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Record store (database) failure.
    #[error("record store: {0}")]
    Records(#[from] RepositoryError),

    /// Object store (blob storage) failure.
    #[error("object store: {0}")]
    Objects(#[from] ObjectStoreError),
}
