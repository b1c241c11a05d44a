//! In-memory record and object stores for unit tests.
//!
//! `MemoryDb` implements every repository trait over one shared state so
//! that product deletes cascade to images the way the schema does.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use virtual_craft_core::{
    Customization, Email, ImageId, Product, ProductDetails, ProductId, ProductImage, ProductPatch,
    ProductWithImages, User, UserId, UserPatch,
};

use crate::db::{
    ImageRepository, NewImage, ProductDraft, ProductRepository, RepositoryError, UserRepository,
};
use crate::services::{CatalogService, UserService};
use crate::storage::{ObjectStore, ObjectStoreError};

#[derive(Default)]
struct State {
    products: Vec<Product>,
    images: Vec<ProductImage>,
    customizations: HashMap<ProductId, Vec<Customization>>,
    users: Vec<User>,
}

/// Shared in-memory record store.
#[derive(Default)]
pub struct MemoryDb {
    state: Mutex<State>,
    /// Number of upcoming image inserts that report a primary conflict.
    pub insert_conflicts: AtomicUsize,
    /// Make every image insert fail with a database error.
    pub fail_inserts: AtomicBool,
    /// Number of image inserts attempted.
    pub insert_attempts: AtomicUsize,
    /// Number of bulk reorder statements issued.
    pub reorder_calls: AtomicUsize,
}

impl MemoryDb {
    pub fn add_product(&self, name: &str, cents: u32, active: bool) -> Product {
        let now = Utc::now();
        let product = Product {
            id: ProductId::generate(),
            name: name.to_owned(),
            description: None,
            price: virtual_craft_core::Price::from_cents(cents),
            active,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().unwrap().products.push(product.clone());
        product
    }

    pub fn add_image(&self, product_id: ProductId, display_order: i32, is_primary: bool) -> ProductImage {
        let mut state = self.state.lock().unwrap();
        let id = ImageId::generate();
        let image = ProductImage {
            id,
            product_id,
            storage_path: format!("products/{product_id}/{id}.jpg"),
            public_url: format!("http://localhost/media/products/{product_id}/{id}.jpg"),
            display_order,
            is_primary,
            // Strictly increasing so ties on display_order sort by insertion
            created_at: Utc::now() + Duration::milliseconds(i64::try_from(state.images.len()).unwrap()),
        };
        state.images.push(image.clone());
        image
    }

    pub fn set_customizations(&self, product_id: ProductId, customizations: Vec<Customization>) {
        self.state
            .lock()
            .unwrap()
            .customizations
            .insert(product_id, customizations);
    }

    pub fn images(&self, product_id: ProductId) -> Vec<ProductImage> {
        let state = self.state.lock().unwrap();
        sorted_images(&state, product_id)
    }

    pub fn primary_count(&self, product_id: ProductId) -> usize {
        self.images(product_id).iter().filter(|i| i.is_primary).count()
    }

    pub fn product_count(&self) -> usize {
        self.state.lock().unwrap().products.len()
    }
}

fn sorted_images(state: &State, product_id: ProductId) -> Vec<ProductImage> {
    let mut images: Vec<ProductImage> = state
        .images
        .iter()
        .filter(|i| i.product_id == product_id)
        .cloned()
        .collect();
    images.sort_by(|a, b| {
        a.display_order
            .cmp(&b.display_order)
            .then(a.created_at.cmp(&b.created_at))
    });
    images
}

#[async_trait]
impl ProductRepository for MemoryDb {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<ProductWithImages>, RepositoryError> {
        let state = self.state.lock().unwrap();
        let mut products: Vec<Product> =
            state.products.iter().filter(|p| p.active).cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products
            .into_iter()
            .map(|product| ProductWithImages {
                images: sorted_images(&state, product.id),
                product,
            })
            .collect())
    }

    async fn get_details(&self, id: ProductId) -> Result<Option<ProductDetails>, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state.products.iter().find(|p| p.id == id).map(|p| ProductDetails {
            product: p.clone(),
            images: sorted_images(&state, id),
            customizations: state.customizations.get(&id).cloned().unwrap_or_default(),
        }))
    }

    async fn exists(&self, id: ProductId) -> Result<bool, RepositoryError> {
        Ok(self.state.lock().unwrap().products.iter().any(|p| p.id == id))
    }

    async fn create(&self, draft: &ProductDraft) -> Result<Product, RepositoryError> {
        let now = Utc::now();
        let product = Product {
            id: ProductId::generate(),
            name: draft.name.clone(),
            description: draft.description.clone(),
            price: draft.price,
            active: draft.active,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().unwrap().products.push(product.clone());
        Ok(product)
    }

    async fn update(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let Some(product) = state.products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
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
        product.updated_at = Utc::now();
        Ok(Some(product.clone()))
    }

    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let before = state.products.len();
        state.products.retain(|p| p.id != id);
        state.images.retain(|i| i.product_id != id);
        state.customizations.remove(&id);
        Ok(state.products.len() < before)
    }
}

#[async_trait]
impl ImageRepository for MemoryDb {
    async fn list(&self, product_id: ProductId) -> Result<Vec<ProductImage>, RepositoryError> {
        Ok(self.images(product_id))
    }

    async fn get(&self, id: ImageId) -> Result<Option<ProductImage>, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state.images.iter().find(|i| i.id == id).cloned())
    }

    async fn count(&self, product_id: ProductId) -> Result<i64, RepositoryError> {
        Ok(i64::try_from(self.images(product_id).len()).unwrap())
    }

    async fn insert(&self, image: &NewImage) -> Result<ProductImage, RepositoryError> {
        self.insert_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        if self
            .insert_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(RepositoryError::Conflict("injected conflict".to_owned()));
        }

        let mut state = self.state.lock().unwrap();
        if image.is_primary
            && state
                .images
                .iter()
                .any(|i| i.product_id == image.product_id && i.is_primary)
        {
            return Err(RepositoryError::Conflict(
                "product already has a primary image".to_owned(),
            ));
        }
        let row = ProductImage {
            id: ImageId::generate(),
            product_id: image.product_id,
            storage_path: image.storage_path.clone(),
            public_url: image.public_url.clone(),
            display_order: image.display_order,
            is_primary: image.is_primary,
            created_at: Utc::now(),
        };
        state.images.push(row.clone());
        Ok(row)
    }

    async fn set_display_order(
        &self,
        id: ImageId,
        display_order: i32,
    ) -> Result<Option<ProductImage>, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        Ok(state.images.iter_mut().find(|i| i.id == id).map(|image| {
            image.display_order = display_order;
            image.clone()
        }))
    }

    async fn promote(&self, id: ImageId) -> Result<Option<ProductImage>, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let Some(product_id) = state.images.iter().find(|i| i.id == id).map(|i| i.product_id)
        else {
            return Ok(None);
        };
        for image in state.images.iter_mut().filter(|i| i.product_id == product_id) {
            image.is_primary = image.id == id;
        }
        Ok(state.images.iter().find(|i| i.id == id).cloned())
    }

    async fn delete(&self, id: ImageId) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let before = state.images.len();
        state.images.retain(|i| i.id != id);
        Ok(state.images.len() < before)
    }

    async fn elect_primary(
        &self,
        product_id: ProductId,
    ) -> Result<Option<ProductImage>, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let ordered = sorted_images(&state, product_id);
        if ordered.iter().any(|i| i.is_primary) {
            return Ok(None);
        }
        let Some(first) = ordered.first() else {
            return Ok(None);
        };
        let image = state.images.iter_mut().find(|i| i.id == first.id).unwrap();
        image.is_primary = true;
        Ok(Some(image.clone()))
    }

    async fn reorder(
        &self,
        product_id: ProductId,
        ids: &[ImageId],
    ) -> Result<u64, RepositoryError> {
        self.reorder_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        let mut updated = 0;
        for (index, id) in ids.iter().enumerate() {
            if let Some(image) = state
                .images
                .iter_mut()
                .find(|i| i.id == *id && i.product_id == product_id)
            {
                image.display_order = i32::try_from(index).unwrap();
                updated += 1;
            }
        }
        Ok(updated)
    }
}

#[async_trait]
impl UserRepository for MemoryDb {
    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state.users.iter().find(|u| &u.email == email).cloned())
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn upsert_from_identity(
        &self,
        email: &Email,
        name: &str,
        picture: Option<&str>,
    ) -> Result<User, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        if let Some(user) = state.users.iter_mut().find(|u| &u.email == email) {
            name.clone_into(&mut user.name);
            user.picture = picture.map(str::to_owned);
            user.last_login = now;
            return Ok(user.clone());
        }
        let user = User {
            id: UserId::generate(),
            email: email.clone(),
            name: name.to_owned(),
            picture: picture.map(str::to_owned),
            created_at: now,
            last_login: now,
            is_admin: false,
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn update(&self, id: UserId, patch: &UserPatch) -> Result<Option<User>, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        Ok(state.users.iter_mut().find(|u| u.id == id).map(|user| {
            if let Some(name) = &patch.name {
                user.name.clone_from(name);
            }
            if let Some(picture) = &patch.picture {
                user.picture = Some(picture.clone());
            }
            if let Some(is_admin) = patch.is_admin {
                user.is_admin = is_admin;
            }
            user.clone()
        }))
    }
}

/// In-memory object store with a fixed set of containers.
pub struct MemoryObjectStore {
    container: String,
    containers: Vec<String>,
    objects: Mutex<HashMap<String, Vec<u8>>>,
    /// Make every upload fail.
    pub fail_uploads: AtomicBool,
    /// Make every removal fail.
    pub fail_removes: AtomicBool,
}

impl MemoryObjectStore {
    /// A store whose configured container exists.
    pub fn provisioned() -> Self {
        Self::with_containers(&["product-images"])
    }

    pub fn with_containers(containers: &[&str]) -> Self {
        Self {
            container: "product-images".to_owned(),
            containers: containers.iter().map(|c| (*c).to_owned()).collect(),
            objects: Mutex::new(HashMap::new()),
            fail_uploads: AtomicBool::new(false),
            fail_removes: AtomicBool::new(false),
        }
    }

    pub fn paths(&self) -> HashSet<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn put(&self, path: &str) {
        self.objects.lock().unwrap().insert(path.to_owned(), vec![0]);
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn container(&self) -> &str {
        &self.container
    }

    async fn list_containers(&self) -> Result<Vec<String>, ObjectStoreError> {
        Ok(self.containers.clone())
    }

    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Api {
                status: 500,
                message: "injected failure".to_owned(),
            });
        }
        self.objects.lock().unwrap().insert(path.to_owned(), bytes);
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("http://localhost:3000/media/{path}")
    }

    async fn remove(&self, paths: &[String]) -> Result<(), ObjectStoreError> {
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Api {
                status: 500,
                message: "injected failure".to_owned(),
            });
        }
        let mut objects = self.objects.lock().unwrap();
        for path in paths {
            objects.remove(path);
        }
        Ok(())
    }
}

/// Services wired to fresh in-memory stores.
pub struct Harness {
    pub db: Arc<MemoryDb>,
    pub objects: Arc<MemoryObjectStore>,
    pub catalog: CatalogService,
    pub users: UserService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_objects(MemoryObjectStore::provisioned())
    }

    pub fn with_objects(objects: MemoryObjectStore) -> Self {
        let db = Arc::new(MemoryDb::default());
        let objects = Arc::new(objects);
        let catalog = CatalogService::new(db.clone(), db.clone(), objects.clone());
        let users = UserService::new(db.clone());
        Self {
            db,
            objects,
            catalog,
            users,
        }
    }
}
