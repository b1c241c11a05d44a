//! Object storage for product image blobs.
//!
//! Blobs live in a single container (a Supabase bucket, or a directory for
//! the local backend). Keys are slash-separated relative paths such as
//! `products/{product_id}/{millis}-{file}`.

pub mod local;
pub mod supabase;

use async_trait::async_trait;
use thiserror::Error;

pub use local::LocalObjectStore;
pub use supabase::SupabaseObjectStore;

/// Errors that can occur when talking to an object store.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    /// Local filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Storage API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Object key is empty, absolute, or escapes the container.
    #[error("invalid object path: {0}")]
    InvalidPath(String),

    /// Client could not be built from the supplied settings.
    #[error("invalid storage configuration: {0}")]
    Configuration(String),
}

/// A container of binary objects addressable by path.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Name of the configured container.
    fn container(&self) -> &str;

    /// Names of the containers that currently exist.
    async fn list_containers(&self) -> Result<Vec<String>, ObjectStoreError>;

    /// Store `bytes` under `path` in the configured container.
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError>;

    /// Publicly reachable URL for `path`.
    fn public_url(&self, path: &str) -> String;

    /// Remove objects. Paths that do not exist are ignored.
    async fn remove(&self, paths: &[String]) -> Result<(), ObjectStoreError>;
}

/// Reject keys that are empty, absolute, or contain `..`/empty segments.
pub(crate) fn validate_path(path: &str) -> Result<(), ObjectStoreError> {
    let bad = path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");

    if bad {
        return Err(ObjectStoreError::InvalidPath(path.to_owned()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path_accepts_nested_keys() {
        assert!(validate_path("products/abc/1700000000000-vase.jpg").is_ok());
    }

    #[test]
    fn test_validate_path_rejects_escapes() {
        for path in ["", "/etc/passwd", "products/../secret", "a//b", "a\\b", "./a"] {
            assert!(
                matches!(validate_path(path), Err(ObjectStoreError::InvalidPath(_))),
                "{path:?} should be rejected"
            );
        }
    }
}
