//! Product image repository over `PostgreSQL`.
//!
//! The one-primary-per-product rule is enforced by the deferred
//! `product_images_one_primary` exclusion constraint. Every statement that
//! moves the flag does so in a single `UPDATE`, so the constraint only ever
//! sees the final state.

use async_trait::async_trait;
use sqlx::PgPool;

use virtual_craft_core::{ImageId, ProductId, ProductImage};

use super::{ImageRepository, NewImage, RepositoryError};

const IMAGE_COLUMNS: &str =
    "id, product_id, storage_path, public_url, display_order, is_primary, created_at";

/// `PostgreSQL` implementation of [`ImageRepository`].
#[derive(Clone)]
pub struct PgImageRepository {
    pool: PgPool,
}

impl PgImageRepository {
    /// Create a new image repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImageRepository for PgImageRepository {
    async fn list(&self, product_id: ProductId) -> Result<Vec<ProductImage>, RepositoryError> {
        let images = sqlx::query_as::<_, ProductImage>(&format!(
            r"
            SELECT {IMAGE_COLUMNS}
            FROM storefront.product_images
            WHERE product_id = $1
            ORDER BY display_order, created_at
            "
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(images)
    }

    async fn get(&self, id: ImageId) -> Result<Option<ProductImage>, RepositoryError> {
        let image = sqlx::query_as::<_, ProductImage>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM storefront.product_images WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(image)
    }

    async fn count(&self, product_id: ProductId) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM storefront.product_images WHERE product_id = $1")
                .bind(product_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn insert(&self, image: &NewImage) -> Result<ProductImage, RepositoryError> {
        sqlx::query_as::<_, ProductImage>(&format!(
            r"
            INSERT INTO storefront.product_images
                (product_id, storage_path, public_url, display_order, is_primary)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {IMAGE_COLUMNS}
            "
        ))
        .bind(image.product_id)
        .bind(&image.storage_path)
        .bind(&image.public_url)
        .bind(image.display_order)
        .bind(image.is_primary)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "product already has a primary image"))
    }

    async fn set_display_order(
        &self,
        id: ImageId,
        display_order: i32,
    ) -> Result<Option<ProductImage>, RepositoryError> {
        let image = sqlx::query_as::<_, ProductImage>(&format!(
            r"
            UPDATE storefront.product_images
            SET display_order = $2
            WHERE id = $1
            RETURNING {IMAGE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(display_order)
        .fetch_optional(&self.pool)
        .await?;
        Ok(image)
    }

    async fn promote(&self, id: ImageId) -> Result<Option<ProductImage>, RepositoryError> {
        // Touches every sibling, so the returned set includes the cleared rows
        let rows = sqlx::query_as::<_, ProductImage>(&format!(
            r"
            UPDATE storefront.product_images
            SET is_primary = (id = $1)
            WHERE product_id = (SELECT product_id FROM storefront.product_images WHERE id = $1)
            RETURNING {IMAGE_COLUMNS}
            "
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "concurrent primary image change"))?;

        Ok(rows.into_iter().find(|img| img.id == id))
    }

    async fn delete(&self, id: ImageId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.product_images WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn elect_primary(
        &self,
        product_id: ProductId,
    ) -> Result<Option<ProductImage>, RepositoryError> {
        let image = sqlx::query_as::<_, ProductImage>(&format!(
            r"
            UPDATE storefront.product_images
            SET is_primary = TRUE
            WHERE id = (
                SELECT id FROM storefront.product_images
                WHERE product_id = $1
                ORDER BY display_order, created_at
                LIMIT 1
            )
            AND NOT EXISTS (
                SELECT 1 FROM storefront.product_images
                WHERE product_id = $1 AND is_primary
            )
            RETURNING {IMAGE_COLUMNS}
            "
        ))
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "concurrent primary image change"))?;
        Ok(image)
    }

    async fn reorder(
        &self,
        product_id: ProductId,
        ids: &[ImageId],
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.product_images AS img
            SET display_order = (o.ord - 1)::int
            FROM UNNEST($2::uuid[]) WITH ORDINALITY AS o(id, ord)
            WHERE img.id = o.id AND img.product_id = $1
            ",
        )
        .bind(product_id)
        .bind(ids)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
