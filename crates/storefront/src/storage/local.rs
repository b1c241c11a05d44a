//! Filesystem-backed object store.
//!
//! Each subdirectory of `root` is a container. Objects of the configured
//! container are served by the storefront under `/media/`, so public URLs are
//! `{base_url}/media/{path}`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{ObjectStore, ObjectStoreError, validate_path};

/// Object store that writes blobs below a local directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    container: String,
    base_url: String,
}

impl LocalObjectStore {
    /// Create a store rooted at `root` using `container` as the bucket directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, container: impl Into<String>, base_url: &str) -> Self {
        Self {
            root: root.into(),
            container: container.into(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Directory holding the configured container's objects.
    #[must_use]
    pub fn container_dir(&self) -> PathBuf {
        self.root.join(&self.container)
    }

    fn object_path(&self, path: &str) -> Result<PathBuf, ObjectStoreError> {
        validate_path(path)?;
        Ok(path
            .split('/')
            .fold(self.container_dir(), |acc, segment| acc.join(segment)))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    fn container(&self) -> &str {
        &self.container
    }

    async fn list_containers(&self) -> Result<Vec<String>, ObjectStoreError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut containers = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir()
                && let Some(name) = entry.file_name().to_str()
            {
                containers.push(name.to_owned());
            }
        }
        containers.sort();
        Ok(containers)
    }

    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let target = self.object_path(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;
        debug!(path = %target.display(), "Stored object");
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/media/{path}", self.base_url)
    }

    async fn remove(&self, paths: &[String]) -> Result<(), ObjectStoreError> {
        for path in paths {
            let target = self.object_path(path)?;
            match tokio::fs::remove_file(&target).await {
                Ok(()) => prune_empty_parents(&target, &self.container_dir()).await,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// Remove now-empty directories between `file` and `stop` (exclusive).
async fn prune_empty_parents(file: &Path, stop: &Path) {
    let mut dir = file.parent();
    while let Some(current) = dir {
        if current == stop || tokio::fs::remove_dir(current).await.is_err() {
            break;
        }
        dir = current.parent();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store(root: &Path) -> LocalObjectStore {
        LocalObjectStore::new(root, "product-images", "http://localhost:3000/")
    }

    #[tokio::test]
    async fn test_list_containers_reports_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        assert!(store.list_containers().await.unwrap().is_empty());

        tokio::fs::create_dir(store.container_dir()).await.unwrap();
        tokio::fs::write(dir.path().join("stray.txt"), b"x").await.unwrap();

        assert_eq!(store.list_containers().await.unwrap(), vec!["product-images"]);
    }

    #[tokio::test]
    async fn test_upload_then_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let path = "products/p1/1700000000000-vase.jpg";

        store.upload(path, vec![1, 2, 3], "image/jpeg").await.unwrap();
        let on_disk = store.container_dir().join("products/p1/1700000000000-vase.jpg");
        assert_eq!(tokio::fs::read(&on_disk).await.unwrap(), vec![1, 2, 3]);

        store.remove(&[path.to_owned()]).await.unwrap();
        assert!(!on_disk.exists());
        assert!(!store.container_dir().join("products").exists());
        assert!(store.container_dir().exists());
    }

    #[tokio::test]
    async fn test_remove_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        store
            .remove(&["products/p1/missing.jpg".to_owned()])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_upload_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let err = store
            .upload("../outside.jpg", vec![0], "image/jpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, ObjectStoreError::InvalidPath(_)));
    }

    #[test]
    fn test_public_url_strips_trailing_slash() {
        let store = LocalObjectStore::new("media", "product-images", "https://shop.test/");
        assert_eq!(
            store.public_url("products/p1/a.jpg"),
            "https://shop.test/media/products/p1/a.jpg"
        );
    }
}
