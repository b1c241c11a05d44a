//! Product catalog service.
//!
//! Owns the gallery invariants: every product with at least one image has
//! exactly one primary image, and `display_order` ranks images within a
//! product from zero. Uploading writes the blob before the row; deleting
//! removes the blob before the row.

mod error;

pub use error::CatalogError;

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use virtual_craft_core::{
    ImageId, ImagePatch, NewProduct, Product, ProductDetails, ProductId, ProductImage,
    ProductPatch, ProductWithImages,
};

use crate::db::{ImageRepository, NewImage, ProductDraft, ProductRepository, RepositoryError};
use crate::storage::ObjectStore;

/// Insert attempts for a new image row before giving up on primary conflicts.
const MAX_INSERT_ATTEMPTS: u32 = 3;

/// An image file received from a client.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

/// Catalog operations over the record store and object store.
#[derive(Clone)]
pub struct CatalogService {
    products: Arc<dyn ProductRepository>,
    images: Arc<dyn ImageRepository>,
    storage: Arc<dyn ObjectStore>,
}

impl CatalogService {
    /// Create a new catalog service.
    #[must_use]
    pub fn new(
        products: Arc<dyn ProductRepository>,
        images: Arc<dyn ImageRepository>,
        storage: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            products,
            images,
            storage,
        }
    }

    /// Verify the record store answers and the image container exists.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the database is unreachable and
    /// `CatalogError::Configuration` if the container is missing.
    pub async fn check_ready(&self) -> Result<(), CatalogError> {
        self.products.ping().await?;
        self.ensure_container().await
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Active products ordered by name, each with its ordered gallery.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the record store fails.
    #[instrument(skip(self))]
    pub async fn list_active(&self) -> Result<Vec<ProductWithImages>, CatalogError> {
        self.products
            .list_active()
            .await
            .inspect_err(|e| error!(error = %e, "Failed to list active products"))
            .map_err(Into::into)
    }

    /// A product with its images and customizations, active or not.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no product has this id.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_by_id(&self, id: ProductId) -> Result<ProductDetails, CatalogError> {
        self.products
            .get_details(id)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to load product"))?
            .ok_or_else(|| product_not_found(id))
    }

    /// Create a product. `active` defaults to true.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` if the name is blank or the price is
    /// missing.
    #[instrument(skip(self, input))]
    pub async fn create(&self, input: NewProduct) -> Result<Product, CatalogError> {
        let name = input
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| CatalogError::Validation("Product name is required".to_owned()))?;
        let price = input
            .price
            .ok_or_else(|| CatalogError::Validation("Product price is required".to_owned()))?;

        let draft = ProductDraft {
            name: name.to_owned(),
            description: normalize_text(input.description),
            price,
            active: input.active.unwrap_or(true),
        };

        let product = self
            .products
            .create(&draft)
            .await
            .inspect_err(|e| error!(error = %e, name = %draft.name, "Failed to create product"))?;

        info!(product_id = %product.id, name = %product.name, "Product created");
        Ok(product)
    }

    /// Apply a partial update to a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for an empty patch or blank name and
    /// `CatalogError::NotFound` if no product has this id.
    #[instrument(skip(self, patch), fields(product_id = %id))]
    pub async fn update(
        &self,
        id: ProductId,
        mut patch: ProductPatch,
    ) -> Result<Product, CatalogError> {
        if patch.is_empty() {
            return Err(CatalogError::Validation("No fields to update".to_owned()));
        }

        if let Some(name) = patch.name.take() {
            let name = name.trim();
            if name.is_empty() {
                return Err(CatalogError::Validation(
                    "Product name cannot be blank".to_owned(),
                ));
            }
            patch.name = Some(name.to_owned());
        }
        // A blank description clears it, as on create
        if let Some(description) = patch.description.take() {
            patch.description = Some(normalize_text(description));
        }

        self.products
            .update(id, &patch)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to update product"))?
            .ok_or_else(|| product_not_found(id))
    }

    /// Delete a product, its images, and their blobs. Deleting a missing
    /// product succeeds.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the record store fails. Blob removal
    /// failures are logged and do not abort the delete.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete(&self, id: ProductId) -> Result<(), CatalogError> {
        let images = self
            .images
            .list(id)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to list images for product delete"))?;

        if !images.is_empty() {
            let paths: Vec<String> = images.into_iter().map(|img| img.storage_path).collect();
            if let Err(e) = self.storage.remove(&paths).await {
                warn!(error = %e, count = paths.len(), "Failed to remove product image blobs");
            }
        }

        let deleted = self
            .products
            .delete(id)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to delete product"))?;

        if deleted {
            info!("Product deleted");
        }
        Ok(())
    }

    // =========================================================================
    // Images
    // =========================================================================

    /// Images of a product ordered by `display_order`, then `created_at`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the record store fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn list_images(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ProductImage>, CatalogError> {
        self.images
            .list(product_id)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to list product images"))
            .map_err(Into::into)
    }

    /// Store an image blob and append it to the product's gallery.
    ///
    /// The first image of a product becomes its primary image.
    ///
    /// # Errors
    ///
    /// - `CatalogError::Validation` for an empty file or blank filename
    /// - `CatalogError::Configuration` if the image container is missing
    /// - `CatalogError::NotFound` if the product does not exist
    /// - `CatalogError::Storage` if the upload or row insert fails
    #[instrument(
        skip(self, image),
        fields(product_id = %product_id, filename = %image.filename, size = image.bytes.len())
    )]
    pub async fn upload_image(
        &self,
        product_id: ProductId,
        image: UploadedImage,
    ) -> Result<ProductImage, CatalogError> {
        if image.bytes.is_empty() {
            return Err(CatalogError::Validation("Image file is empty".to_owned()));
        }
        let filename = sanitize_filename(&image.filename)
            .ok_or_else(|| CatalogError::Validation("Image filename is required".to_owned()))?;

        self.ensure_container().await?;

        let exists = self
            .products
            .exists(product_id)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to check product"))?;
        if !exists {
            return Err(product_not_found(product_id));
        }

        let storage_path = format!(
            "products/{product_id}/{}-{filename}",
            chrono::Utc::now().timestamp_millis()
        );

        self.storage
            .upload(&storage_path, image.bytes, &image.content_type)
            .await
            .inspect_err(|e| error!(error = %e, path = %storage_path, "Failed to upload image"))?;
        let public_url = self.storage.public_url(&storage_path);

        match self.insert_image(product_id, &storage_path, public_url).await {
            Ok(row) => {
                info!(image_id = %row.id, is_primary = row.is_primary, "Image uploaded");
                Ok(row)
            }
            Err(e) => {
                error!(error = %e, path = %storage_path, "Failed to record uploaded image");
                if let Err(cleanup) = self.storage.remove(&[storage_path.clone()]).await {
                    warn!(error = %cleanup, path = %storage_path, "Failed to remove orphaned blob");
                }
                Err(e.into())
            }
        }
    }

    /// Insert the row for an uploaded blob, recounting on primary conflicts.
    async fn insert_image(
        &self,
        product_id: ProductId,
        storage_path: &str,
        public_url: String,
    ) -> Result<ProductImage, RepositoryError> {
        let mut attempt = 1;
        loop {
            let count = self.images.count(product_id).await?;
            let row = NewImage {
                product_id,
                storage_path: storage_path.to_owned(),
                public_url: public_url.clone(),
                display_order: i32::try_from(count).unwrap_or(i32::MAX),
                is_primary: count == 0,
            };

            match self.images.insert(&row).await {
                Err(RepositoryError::Conflict(reason)) if attempt < MAX_INSERT_ATTEMPTS => {
                    warn!(attempt, %reason, "Image insert conflicted, retrying");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Change an image's primary flag and/or position.
    ///
    /// Promoting an image clears the flag on its siblings in the same
    /// statement. Demoting the current primary is rejected; promote another
    /// image instead.
    ///
    /// # Errors
    ///
    /// - `CatalogError::Validation` for an empty patch, a negative order, or
    ///   an attempt to demote the primary image
    /// - `CatalogError::NotFound` if the image does not belong to the product
    #[instrument(skip(self), fields(product_id = %product_id, image_id = %image_id))]
    pub async fn update_image(
        &self,
        product_id: ProductId,
        image_id: ImageId,
        patch: ImagePatch,
    ) -> Result<ProductImage, CatalogError> {
        if patch.is_empty() {
            return Err(CatalogError::Validation("No fields to update".to_owned()));
        }
        if patch.display_order.is_some_and(|order| order < 0) {
            return Err(CatalogError::Validation(
                "Display order cannot be negative".to_owned(),
            ));
        }

        let mut image = self.owned_image(product_id, image_id).await?;

        match patch.is_primary {
            // Re-promoting an existing primary also clears any stray sibling flag
            Some(true) => {
                image = self
                    .images
                    .promote(image_id)
                    .await
                    .inspect_err(|e| error!(error = %e, "Failed to promote image"))?
                    .ok_or_else(|| image_not_found(image_id))?;
                info!("Primary image changed");
            }
            Some(false) if image.is_primary => {
                return Err(CatalogError::Validation(
                    "Cannot unset the primary image; promote another image instead".to_owned(),
                ));
            }
            _ => {}
        }

        if let Some(order) = patch.display_order {
            image = self
                .images
                .set_display_order(image_id, order)
                .await
                .inspect_err(|e| error!(error = %e, "Failed to move image"))?
                .ok_or_else(|| image_not_found(image_id))?;
        }

        Ok(image)
    }

    /// Delete an image and its blob. If it was primary, the remaining image
    /// with the lowest `display_order` becomes primary.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the image does not belong to the
    /// product and `CatalogError::Storage` if any step fails. Steps already
    /// completed are not rolled back.
    #[instrument(skip(self), fields(product_id = %product_id, image_id = %image_id))]
    pub async fn delete_image(
        &self,
        product_id: ProductId,
        image_id: ImageId,
    ) -> Result<(), CatalogError> {
        let image = self.owned_image(product_id, image_id).await?;

        self.storage
            .remove(&[image.storage_path.clone()])
            .await
            .inspect_err(|e| error!(error = %e, path = %image.storage_path, "Failed to remove image blob"))?;

        self.images
            .delete(image_id)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to delete image row"))?;

        if image.is_primary {
            let elected = self
                .images
                .elect_primary(product_id)
                .await
                .inspect_err(|e| error!(error = %e, "Failed to elect new primary image"))?;
            if let Some(next) = elected {
                info!(new_primary = %next.id, "Primary image re-elected");
            }
        }

        info!("Image deleted");
        Ok(())
    }

    /// Rewrite `display_order` so each image's position matches its index in
    /// `ordered_ids`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` if an id repeats or does not belong
    /// to the product.
    #[instrument(skip(self, ordered_ids), fields(product_id = %product_id, count = ordered_ids.len()))]
    pub async fn reorder_images(
        &self,
        product_id: ProductId,
        ordered_ids: &[ImageId],
    ) -> Result<(), CatalogError> {
        let mut seen = HashSet::with_capacity(ordered_ids.len());
        if let Some(dup) = ordered_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(CatalogError::Validation(format!(
                "Image {dup} appears more than once"
            )));
        }

        let owned: HashSet<ImageId> = self
            .images
            .list(product_id)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to list images for reorder"))?
            .into_iter()
            .map(|img| img.id)
            .collect();

        if let Some(foreign) = ordered_ids.iter().find(|id| !owned.contains(id)) {
            return Err(CatalogError::Validation(format!(
                "Image {foreign} does not belong to product {product_id}"
            )));
        }

        if ordered_ids.is_empty() {
            return Ok(());
        }

        self.images
            .reorder(product_id, ordered_ids)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to reorder images"))?;
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Confirm the configured image container exists.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Configuration`] when it is missing.
    pub async fn ensure_container(&self) -> Result<(), CatalogError> {
        let wanted = self.storage.container();
        let containers = self
            .storage
            .list_containers()
            .await
            .inspect_err(|e| error!(error = %e, "Failed to list storage containers"))?;

        if containers.iter().any(|c| c == wanted) {
            Ok(())
        } else {
            error!(container = wanted, "Image storage container does not exist");
            Err(CatalogError::Configuration(format!(
                "container '{wanted}' does not exist"
            )))
        }
    }

    async fn owned_image(
        &self,
        product_id: ProductId,
        image_id: ImageId,
    ) -> Result<ProductImage, CatalogError> {
        self.images
            .get(image_id)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to load image"))?
            .filter(|img| img.product_id == product_id)
            .ok_or_else(|| image_not_found(image_id))
    }
}

fn product_not_found(id: ProductId) -> CatalogError {
    CatalogError::NotFound(format!("Product {id}"))
}

fn image_not_found(id: ImageId) -> CatalogError {
    CatalogError::NotFound(format!("Image {id}"))
}

/// Trim a free-text field, mapping blank to `None`.
fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Reduce a client filename to a safe single path segment.
///
/// Drops any directory part and replaces characters outside
/// `[A-Za-z0-9._-]` with `-`. Returns `None` when nothing usable remains.
fn sanitize_filename(raw: &str) -> Option<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '-') {
        None
    } else {
        Some(cleaned.to_owned())
    }
}
