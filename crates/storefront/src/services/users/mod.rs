//! User service.
//!
//! Users are created from the identity provider's `{email, name, picture}`
//! handoff. The email is the identity key; admin rights are only ever
//! granted through [`UserService::set_fields`].

mod error;

pub use error::UserError;

use std::sync::Arc;

use tracing::{error, info, instrument};

use virtual_craft_core::{Email, ExternalIdentity, User, UserId, UserPatch};

use crate::db::UserRepository;

/// User profile operations.
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Look up a user by email. Absence is not an error.
    ///
    /// # Errors
    ///
    /// Returns `UserError::InvalidEmail` if the email is malformed.
    #[instrument(skip(self))]
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        let email = Email::parse(email)?;
        self.users
            .get_by_email(&email)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to look up user by email"))
            .map_err(Into::into)
    }

    /// Create the user for an external login, or refresh the existing one.
    ///
    /// New users are never admins; an existing user's admin flag is kept.
    ///
    /// # Errors
    ///
    /// Returns `UserError::InvalidEmail` or `UserError::Validation` for bad
    /// identity data.
    #[instrument(skip(self, identity), fields(email = %identity.email))]
    pub async fn create_or_update_from_identity(
        &self,
        identity: ExternalIdentity,
    ) -> Result<User, UserError> {
        let email = Email::parse(&identity.email)?;
        let name = identity.name.trim();
        if name.is_empty() {
            return Err(UserError::Validation("Name is required".to_owned()));
        }
        let picture = identity
            .picture
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty());

        let user = self
            .users
            .upsert_from_identity(&email, name, picture)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to upsert user"))?;

        info!(user_id = %user.id, "User signed in");
        Ok(user)
    }

    /// Apply a partial update to a user.
    ///
    /// # Errors
    ///
    /// Returns `UserError::Validation` for an empty patch or blank name and
    /// `UserError::NotFound` if the user does not exist.
    #[instrument(skip(self, patch), fields(user_id = %id))]
    pub async fn set_fields(&self, id: UserId, mut patch: UserPatch) -> Result<User, UserError> {
        if patch.is_empty() {
            return Err(UserError::Validation("No fields to update".to_owned()));
        }
        if let Some(name) = patch.name.take() {
            let name = name.trim();
            if name.is_empty() {
                return Err(UserError::Validation("Name cannot be blank".to_owned()));
            }
            patch.name = Some(name.to_owned());
        }

        let user = self
            .users
            .update(id, &patch)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to update user"))?
            .ok_or(UserError::NotFound)?;

        if let Some(is_admin) = patch.is_admin {
            info!(is_admin, "User admin flag changed");
        }
        Ok(user)
    }

    /// Whether the user may use catalog administration.
    ///
    /// # Errors
    ///
    /// Returns `UserError::NotFound` if the user does not exist.
    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn is_admin(&self, id: UserId) -> Result<bool, UserError> {
        self.users
            .get_by_id(id)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to load user"))?
            .map(|user| user.is_admin)
            .ok_or(UserError::NotFound)
    }
}
