//! Product repository over `PostgreSQL`.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;

use virtual_craft_core::{
    Customization, CustomizationOption, CustomizationType, CustomizationTypeId, Product,
    ProductDetails, ProductId, ProductImage, ProductPatch, ProductWithImages,
};

use super::{ProductDraft, ProductRepository, RepositoryError};

const PRODUCT_COLUMNS: &str = "id, name, description, price, active, created_at, updated_at";

/// `PostgreSQL` implementation of [`ProductRepository`].
#[derive(Clone)]
pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn images_for(&self, ids: &[ProductId]) -> Result<Vec<ProductImage>, RepositoryError> {
        let images = sqlx::query_as::<_, ProductImage>(
            r"
            SELECT id, product_id, storage_path, public_url, display_order, is_primary, created_at
            FROM storefront.product_images
            WHERE product_id = ANY($1)
            ORDER BY display_order, created_at
            ",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(images)
    }

    async fn customizations_for(
        &self,
        id: ProductId,
    ) -> Result<Vec<Customization>, RepositoryError> {
        let kinds = sqlx::query_as::<_, CustomizationType>(
            r"
            SELECT t.id, t.name, t.created_at
            FROM storefront.customization_types t
            JOIN storefront.product_customizations pc ON pc.customization_type_id = t.id
            WHERE pc.product_id = $1
            ORDER BY t.name
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        if kinds.is_empty() {
            return Ok(Vec::new());
        }

        let type_ids: Vec<CustomizationTypeId> = kinds.iter().map(|k| k.id).collect();
        let options = sqlx::query_as::<_, CustomizationOption>(
            r"
            SELECT id, type_id, value, created_at
            FROM storefront.customization_options
            WHERE type_id = ANY($1)
            ORDER BY value
            ",
        )
        .bind(&type_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_type: HashMap<CustomizationTypeId, Vec<CustomizationOption>> = HashMap::new();
        for option in options {
            by_type.entry(option.type_id).or_default().push(option);
        }

        Ok(kinds
            .into_iter()
            .map(|kind| Customization {
                options: by_type.remove(&kind.id).unwrap_or_default(),
                kind,
            })
            .collect())
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<ProductWithImages>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.products WHERE active ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<ProductId> = products.iter().map(|p| p.id).collect();
        let mut galleries: HashMap<ProductId, Vec<ProductImage>> = HashMap::new();
        for image in self.images_for(&ids).await? {
            galleries.entry(image.product_id).or_default().push(image);
        }

        Ok(products
            .into_iter()
            .map(|product| ProductWithImages {
                images: galleries.remove(&product.id).unwrap_or_default(),
                product,
            })
            .collect())
    }

    async fn get_details(&self, id: ProductId) -> Result<Option<ProductDetails>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(product) = product else {
            return Ok(None);
        };

        let images = self.images_for(&[id]).await?;
        let customizations = self.customizations_for(id).await?;

        Ok(Some(ProductDetails {
            product,
            images,
            customizations,
        }))
    }

    async fn exists(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM storefront.products WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn create(&self, draft: &ProductDraft) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            r"
            INSERT INTO storefront.products (name, description, price, active)
            VALUES ($1, $2, $3, $4)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&draft.name)
        .bind(draft.description.as_deref())
        .bind(draft.price)
        .bind(draft.active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "product already exists"))
    }

    async fn update(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            r"
            UPDATE storefront.products
            SET name = COALESCE($2, name),
                description = CASE WHEN $3 THEN $4 ELSE description END,
                price = COALESCE($5, price),
                active = COALESCE($6, active),
                updated_at = now()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(patch.name.as_deref())
        .bind(patch.description.is_some())
        .bind(patch.description.as_ref().and_then(Option::as_deref))
        .bind(patch.price)
        .bind(patch.active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "product update conflicts"))?;
        Ok(product)
    }

    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
