//! In-memory storefront for store tests.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use virtual_craft_core::{
    Email, ExternalIdentity, ImageId, ImagePatch, NewProduct, Price, Product, ProductDetails,
    ProductId, ProductImage, ProductPatch, ProductWithImages, User, UserId, UserPatch,
};

use crate::api::{ClientError, ImageUpload, StorefrontApi};

#[derive(Default)]
struct State {
    products: Vec<Product>,
    images: Vec<ProductImage>,
    users: Vec<User>,
}

/// Fake API with server-side image semantics and a switch to fail the
/// next call.
#[derive(Default)]
pub struct FakeApi {
    state: Mutex<State>,
    fail_next: Mutex<Option<String>>,
    pub calls: AtomicUsize,
}

impl FakeApi {
    pub fn fail_next(&self, message: &str) {
        *self.fail_next.lock().unwrap() = Some(message.to_string());
    }

    fn enter(&self) -> Result<(), ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fail_next.lock().unwrap().take() {
            Some(message) => Err(ClientError::Api {
                status: 500,
                message,
            }),
            None => Ok(()),
        }
    }

    pub fn add_product(&self, name: &str, cents: u32) -> Product {
        let product = Product {
            id: ProductId::generate(),
            name: name.to_string(),
            description: None,
            price: Price::from_cents(cents),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.state.lock().unwrap().products.push(product.clone());
        product
    }

    pub fn add_image(&self, product_id: ProductId, display_order: i32, is_primary: bool) -> ProductImage {
        let id = ImageId::generate();
        let image = ProductImage {
            id,
            product_id,
            storage_path: format!("products/{product_id}/{id}.jpg"),
            public_url: format!("http://cdn.test/products/{product_id}/{id}.jpg"),
            display_order,
            is_primary,
            created_at: Utc::now(),
        };
        self.state.lock().unwrap().images.push(image.clone());
        image
    }

    pub fn server_images(&self, product_id: ProductId) -> Vec<ProductImage> {
        let mut images: Vec<_> = self
            .state
            .lock()
            .unwrap()
            .images
            .iter()
            .filter(|img| img.product_id == product_id)
            .cloned()
            .collect();
        images.sort_by_key(|img| (img.display_order, img.created_at));
        images
    }

    fn not_found(what: &str) -> ClientError {
        ClientError::Api {
            status: 404,
            message: format!("{what} not found"),
        }
    }
}

#[async_trait]
impl StorefrontApi for FakeApi {
    async fn list_products(&self) -> Result<Vec<ProductWithImages>, ClientError> {
        self.enter()?;
        let products: Vec<Product> = self
            .state
            .lock()
            .unwrap()
            .products
            .iter()
            .filter(|p| p.active)
            .cloned()
            .collect();
        Ok(products
            .into_iter()
            .map(|product| ProductWithImages {
                images: self.server_images(product.id),
                product,
            })
            .collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<ProductDetails, ClientError> {
        self.enter()?;
        let product = self
            .state
            .lock()
            .unwrap()
            .products
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| Self::not_found("Product"))?;
        Ok(ProductDetails {
            images: self.server_images(id),
            product,
            customizations: Vec::new(),
        })
    }

    async fn create_product(&self, input: &NewProduct) -> Result<Product, ClientError> {
        self.enter()?;
        let name = input.name.clone().ok_or_else(|| ClientError::Api {
            status: 400,
            message: "Product name is required".to_string(),
        })?;
        let product = Product {
            id: ProductId::generate(),
            name,
            description: input.description.clone(),
            price: input.price.unwrap_or(Price::ZERO),
            active: input.active.unwrap_or(true),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.state.lock().unwrap().products.push(product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Product, ClientError> {
        self.enter()?;
        let mut state = self.state.lock().unwrap();
        let product = state
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Self::not_found("Product"))?;
        if let Some(name) = &patch.name {
            product.name.clone_from(name);
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        if let Some(active) = patch.active {
            product.active = active;
        }
        if let Some(description) = &patch.description {
            product.description.clone_from(description);
        }
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), ClientError> {
        self.enter()?;
        let mut state = self.state.lock().unwrap();
        state.products.retain(|p| p.id != id);
        state.images.retain(|img| img.product_id != id);
        Ok(())
    }

    async fn list_images(&self, product_id: ProductId) -> Result<Vec<ProductImage>, ClientError> {
        self.enter()?;
        Ok(self.server_images(product_id))
    }

    async fn upload_images(
        &self,
        product_id: ProductId,
        files: Vec<ImageUpload>,
    ) -> Result<Vec<ProductImage>, ClientError> {
        self.enter()?;
        let mut created = Vec::new();
        for _ in files {
            let existing = self.server_images(product_id);
            let order = i32::try_from(existing.len()).unwrap();
            created.push(self.add_image(product_id, order, existing.is_empty()));
        }
        Ok(created)
    }

    async fn update_image(
        &self,
        product_id: ProductId,
        image_id: ImageId,
        patch: ImagePatch,
    ) -> Result<ProductImage, ClientError> {
        self.enter()?;
        let mut state = self.state.lock().unwrap();
        if patch.is_primary == Some(true) {
            for img in state.images.iter_mut().filter(|i| i.product_id == product_id) {
                img.is_primary = img.id == image_id;
            }
        }
        let image = state
            .images
            .iter_mut()
            .find(|i| i.id == image_id && i.product_id == product_id)
            .ok_or_else(|| Self::not_found("Image"))?;
        if let Some(order) = patch.display_order {
            image.display_order = order;
        }
        Ok(image.clone())
    }

    async fn delete_image(
        &self,
        product_id: ProductId,
        image_id: ImageId,
    ) -> Result<(), ClientError> {
        self.enter()?;
        let mut state = self.state.lock().unwrap();
        state.images.retain(|i| i.id != image_id);
        if !state.images.iter().any(|i| i.product_id == product_id && i.is_primary)
            && let Some(next) = state
                .images
                .iter_mut()
                .filter(|i| i.product_id == product_id)
                .min_by_key(|i| (i.display_order, i.created_at))
        {
            next.is_primary = true;
        }
        Ok(())
    }

    async fn reorder_images(
        &self,
        product_id: ProductId,
        image_ids: &[ImageId],
    ) -> Result<Vec<ProductImage>, ClientError> {
        self.enter()?;
        {
            let mut state = self.state.lock().unwrap();
            for (position, id) in image_ids.iter().enumerate() {
                if let Some(img) = state
                    .images
                    .iter_mut()
                    .find(|i| i.id == *id && i.product_id == product_id)
                {
                    img.display_order = i32::try_from(position).unwrap();
                }
            }
        }
        Ok(self.server_images(product_id))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ClientError> {
        self.enter()?;
        let email = email.trim().to_lowercase();
        Ok(self
            .state
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.email.as_str() == email)
            .cloned())
    }

    async fn login(&self, identity: &ExternalIdentity) -> Result<User, ClientError> {
        self.enter()?;
        let email = Email::parse(&identity.email).map_err(|e| ClientError::Api {
            status: 400,
            message: e.to_string(),
        })?;
        let mut state = self.state.lock().unwrap();
        if let Some(user) = state.users.iter_mut().find(|u| u.email == email) {
            user.name.clone_from(&identity.name);
            user.picture.clone_from(&identity.picture);
            user.last_login = Utc::now();
            return Ok(user.clone());
        }
        let user = User {
            id: UserId::generate(),
            email,
            name: identity.name.clone(),
            picture: identity.picture.clone(),
            created_at: Utc::now(),
            last_login: Utc::now(),
            is_admin: false,
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: UserId, patch: &UserPatch) -> Result<User, ClientError> {
        self.enter()?;
        let mut state = self.state.lock().unwrap();
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| Self::not_found("User"))?;
        if let Some(name) = &patch.name {
            user.name.clone_from(name);
        }
        if patch.picture.is_some() {
            user.picture.clone_from(&patch.picture);
        }
        if let Some(is_admin) = patch.is_admin {
            user.is_admin = is_admin;
        }
        Ok(user.clone())
    }

    async fn is_admin(&self, id: UserId) -> Result<bool, ClientError> {
        self.enter()?;
        self.state
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.is_admin)
            .ok_or_else(|| Self::not_found("User"))
    }
}

/// Convenience for building an `Arc<dyn StorefrontApi>` alongside the
/// concrete fake.
pub fn fake() -> (Arc<FakeApi>, Arc<dyn StorefrontApi>) {
    let api = Arc::new(FakeApi::default());
    let dyn_api: Arc<dyn StorefrontApi> = api.clone();
    (api, dyn_api)
}
