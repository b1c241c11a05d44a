//! User repository over `PostgreSQL`.

use async_trait::async_trait;
use sqlx::PgPool;

use virtual_craft_core::{Email, User, UserId, UserPatch};

use super::{RepositoryError, UserRepository};

const USER_COLUMNS: &str = "id, email, name, picture, created_at, last_login, is_admin";

/// `PostgreSQL` implementation of [`UserRepository`].
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM storefront.users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM storefront.users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn upsert_from_identity(
        &self,
        email: &Email,
        name: &str,
        picture: Option<&str>,
    ) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(&format!(
            r"
            INSERT INTO storefront.users (email, name, picture)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO UPDATE
            SET name = EXCLUDED.name,
                picture = EXCLUDED.picture,
                last_login = now()
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(email)
        .bind(name)
        .bind(picture)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "email already exists"))
    }

    async fn update(&self, id: UserId, patch: &UserPatch) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r"
            UPDATE storefront.users
            SET name = COALESCE($2, name),
                picture = COALESCE($3, picture),
                is_admin = COALESCE($4, is_admin)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(patch.name.as_deref())
        .bind(patch.picture.as_deref())
        .bind(patch.is_admin)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}
