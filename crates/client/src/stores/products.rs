//! Product catalog and gallery mirror.

use std::collections::HashMap;
use std::sync::Arc;

use virtual_craft_core::{
    ImageId, ImagePatch, NewProduct, Product, ProductDetails, ProductId, ProductImage,
    ProductPatch, ProductWithImages,
};

use crate::api::{ClientError, ImageUpload, StorefrontApi};

/// Cached catalog state. Cloned as the snapshot for two-phase updates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ProductCache {
    products: Vec<ProductWithImages>,
    current: Option<ProductDetails>,
    galleries: HashMap<ProductId, Vec<ProductImage>>,
}

/// Session-scoped mirror of the catalog.
pub struct ProductStore {
    api: Arc<dyn StorefrontApi>,
    cache: ProductCache,
    loading: bool,
    error: Option<String>,
}

impl ProductStore {
    #[must_use]
    pub fn new(api: Arc<dyn StorefrontApi>) -> Self {
        Self {
            api,
            cache: ProductCache::default(),
            loading: false,
            error: None,
        }
    }

    /// Products from the last listing, plus local creations.
    #[must_use]
    pub fn products(&self) -> &[ProductWithImages] {
        &self.cache.products
    }

    /// The product last loaded with [`ProductStore::fetch_by_id`].
    #[must_use]
    pub const fn current(&self) -> Option<&ProductDetails> {
        self.cache.current.as_ref()
    }

    /// Cached gallery for a product, in display order.
    #[must_use]
    pub fn images(&self, product_id: ProductId) -> &[ProductImage] {
        self.cache
            .galleries
            .get(&product_id)
            .map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub const fn loading(&self) -> bool {
        self.loading
    }

    /// Message from the most recent failed operation.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Drop all cached state.
    pub fn clear(&mut self) {
        self.cache = ProductCache::default();
        self.loading = false;
        self.error = None;
    }

    fn begin(&mut self) -> ProductCache {
        self.loading = true;
        self.error = None;
        self.cache.clone()
    }

    /// Settle an operation. On failure the snapshot is restored and the
    /// error message recorded.
    fn settle<T>(
        &mut self,
        snapshot: ProductCache,
        result: Result<T, ClientError>,
        action: &str,
    ) -> Result<T, ClientError> {
        self.loading = false;
        if let Err(e) = &result {
            tracing::warn!(error = %e, action, "Product store operation failed");
            self.cache = snapshot;
            self.error = Some(e.to_string());
        }
        result
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Load every active product.
    ///
    /// # Errors
    ///
    /// Returns the API error; the previous listing is kept.
    pub async fn fetch_all(&mut self) -> Result<&[ProductWithImages], ClientError> {
        let snapshot = self.begin();
        let result = self.api.list_products().await;
        let products = self.settle(snapshot, result, "fetch_all")?;
        self.cache.products = products;
        Ok(&self.cache.products)
    }

    /// Load one product with its images and customizations into `current`.
    ///
    /// # Errors
    ///
    /// Returns the API error, including not-found.
    pub async fn fetch_by_id(&mut self, id: ProductId) -> Result<&ProductDetails, ClientError> {
        let snapshot = self.begin();
        let result = self.api.get_product(id).await;
        let details = self.settle(snapshot, result, "fetch_by_id")?;
        Ok(&*self.cache.current.insert(details))
    }

    /// Create a product and append it with an empty gallery.
    ///
    /// # Errors
    ///
    /// Returns the API error, including validation failures.
    pub async fn create(&mut self, input: &NewProduct) -> Result<ProductWithImages, ClientError> {
        let snapshot = self.begin();
        let result = self.api.create_product(input).await;
        let product = self.settle(snapshot, result, "create")?;

        let created = ProductWithImages {
            product,
            images: Vec::new(),
        };
        self.cache.products.push(created.clone());
        Ok(created)
    }

    /// Update a product. The patch is applied locally first and replaced by
    /// the server's row on success; cached images are kept.
    ///
    /// # Errors
    ///
    /// Returns the API error after restoring the previous state.
    pub async fn update(
        &mut self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<ProductWithImages, ClientError> {
        let snapshot = self.begin();

        if let Some(entry) = self.cache.products.iter_mut().find(|p| p.product.id == id) {
            apply_product_patch(&mut entry.product, patch);
        }
        if let Some(current) = self.cache.current.as_mut().filter(|c| c.product.id == id) {
            apply_product_patch(&mut current.product, patch);
        }

        let result = self.api.update_product(id, patch).await;
        let product = self.settle(snapshot, result, "update")?;

        let images = self
            .cache
            .products
            .iter()
            .find(|p| p.product.id == id)
            .map(|p| p.images.clone())
            .unwrap_or_default();
        let updated = ProductWithImages {
            product: product.clone(),
            images,
        };

        if let Some(entry) = self.cache.products.iter_mut().find(|p| p.product.id == id) {
            *entry = updated.clone();
        }
        if let Some(current) = self.cache.current.as_mut().filter(|c| c.product.id == id) {
            current.product = product;
        }

        Ok(updated)
    }

    /// Delete a product, removing it from the listing and clearing
    /// `current` when it matches.
    ///
    /// # Errors
    ///
    /// Returns the API error after restoring the previous state.
    pub async fn delete(&mut self, id: ProductId) -> Result<(), ClientError> {
        let snapshot = self.begin();

        self.cache.products.retain(|p| p.product.id != id);
        if self.cache.current.as_ref().is_some_and(|c| c.product.id == id) {
            self.cache.current = None;
        }
        self.cache.galleries.remove(&id);

        let result = self.api.delete_product(id).await;
        self.settle(snapshot, result, "delete")
    }

    // =========================================================================
    // Images
    // =========================================================================

    /// Load a product's gallery.
    ///
    /// # Errors
    ///
    /// Returns the API error; the cached gallery is kept.
    pub async fn fetch_images(
        &mut self,
        product_id: ProductId,
    ) -> Result<&[ProductImage], ClientError> {
        let snapshot = self.begin();
        let result = self.api.list_images(product_id).await;
        let images = self.settle(snapshot, result, "fetch_images")?;
        self.cache.galleries.insert(product_id, images);
        Ok(self.images(product_id))
    }

    /// Upload files and append the created images to the gallery.
    ///
    /// # Errors
    ///
    /// Returns the API error; nothing is appended.
    pub async fn upload_images(
        &mut self,
        product_id: ProductId,
        files: Vec<ImageUpload>,
    ) -> Result<Vec<ProductImage>, ClientError> {
        let snapshot = self.begin();
        let result = self.api.upload_images(product_id, files).await;
        let created = self.settle(snapshot, result, "upload_images")?;

        self.cache
            .galleries
            .entry(product_id)
            .or_default()
            .extend(created.iter().cloned());
        Ok(created)
    }

    /// Update an image's primary flag or position.
    ///
    /// When the image becomes primary, cached siblings lose the flag.
    ///
    /// # Errors
    ///
    /// Returns the API error after restoring the previous state.
    pub async fn update_image(
        &mut self,
        product_id: ProductId,
        image_id: ImageId,
        patch: ImagePatch,
    ) -> Result<ProductImage, ClientError> {
        let snapshot = self.begin();

        if let Some(gallery) = self.cache.galleries.get_mut(&product_id) {
            if let Some(image) = gallery.iter_mut().find(|img| img.id == image_id) {
                if let Some(is_primary) = patch.is_primary {
                    image.is_primary = is_primary;
                }
                if let Some(order) = patch.display_order {
                    image.display_order = order;
                }
            }
            if patch.is_primary == Some(true) {
                demote_others(gallery, image_id);
            }
        }

        let result = self.api.update_image(product_id, image_id, patch).await;
        let image = self.settle(snapshot, result, "update_image")?;

        if let Some(gallery) = self.cache.galleries.get_mut(&product_id) {
            if image.is_primary {
                demote_others(gallery, image_id);
            }
            if let Some(slot) = gallery.iter_mut().find(|img| img.id == image_id) {
                *slot = image.clone();
            }
            sort_gallery(gallery);
        }

        Ok(image)
    }

    /// Delete an image. When it was primary, the cached image with the
    /// lowest `display_order` takes over.
    ///
    /// # Errors
    ///
    /// Returns the API error after restoring the previous state.
    pub async fn delete_image(
        &mut self,
        product_id: ProductId,
        image_id: ImageId,
    ) -> Result<(), ClientError> {
        let snapshot = self.begin();

        if let Some(gallery) = self.cache.galleries.get_mut(&product_id) {
            let removed_primary = gallery
                .iter()
                .any(|img| img.id == image_id && img.is_primary);
            gallery.retain(|img| img.id != image_id);

            if removed_primary
                && let Some(successor) = gallery
                    .iter_mut()
                    .min_by_key(|img| (img.display_order, img.created_at))
            {
                successor.is_primary = true;
            }
        }

        let result = self.api.delete_image(product_id, image_id).await;
        self.settle(snapshot, result, "delete_image")
    }

    /// Reorder a gallery. The order is applied locally first, then replaced
    /// by the server's gallery on success.
    ///
    /// # Errors
    ///
    /// Returns the API error after restoring the previous state.
    pub async fn reorder_images(
        &mut self,
        product_id: ProductId,
        image_ids: &[ImageId],
    ) -> Result<&[ProductImage], ClientError> {
        let snapshot = self.begin();

        if let Some(gallery) = self.cache.galleries.get_mut(&product_id) {
            for (position, id) in image_ids.iter().enumerate() {
                if let Some(image) = gallery.iter_mut().find(|img| img.id == *id) {
                    image.display_order = i32::try_from(position).unwrap_or(i32::MAX);
                }
            }
            sort_gallery(gallery);
        }

        let result = self.api.reorder_images(product_id, image_ids).await;
        let gallery = self.settle(snapshot, result, "reorder_images")?;
        self.cache.galleries.insert(product_id, gallery);
        Ok(self.images(product_id))
    }
}

fn apply_product_patch(product: &mut Product, patch: &ProductPatch) {
    if let Some(name) = &patch.name {
        product.name.clone_from(name);
    }
    if let Some(description) = &patch.description {
        product.description.clone_from(description);
    }
    if let Some(price) = patch.price {
        product.price = price;
    }
    if let Some(active) = patch.active {
        product.active = active;
    }
}

fn demote_others(gallery: &mut [ProductImage], primary: ImageId) {
    for image in gallery.iter_mut().filter(|img| img.id != primary) {
        image.is_primary = false;
    }
}

fn sort_gallery(gallery: &mut [ProductImage]) {
    gallery.sort_by_key(|img| (img.display_order, img.created_at));
}
