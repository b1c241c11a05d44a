//! Catalog error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::StorageError;
use crate::storage::ObjectStoreError;

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Input rejected before touching any store.
    #[error("{0}")]
    Validation(String),

    /// The product or image does not exist (or belongs to another product).
    #[error("{0} not found")]
    NotFound(String),

    /// The object store is not provisioned (e.g. the bucket is missing).
    #[error("storage is not configured: {0}")]
    Configuration(String),

    /// A backing store failed.
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl From<RepositoryError> for CatalogError {
    fn from(err: RepositoryError) -> Self {
        Self::Storage(StorageError::Records(err))
    }
}

impl From<ObjectStoreError> for CatalogError {
    fn from(err: ObjectStoreError) -> Self {
        Self::Storage(StorageError::Objects(err))
    }
}
