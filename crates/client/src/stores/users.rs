//! Signed-in user mirror.

use std::sync::Arc;

use virtual_craft_core::{ExternalIdentity, User, UserId, UserPatch};

use crate::api::{ClientError, StorefrontApi};

/// Session-scoped mirror of the signed-in user.
pub struct UserStore {
    api: Arc<dyn StorefrontApi>,
    current: Option<User>,
    loading: bool,
    error: Option<String>,
}

impl UserStore {
    #[must_use]
    pub fn new(api: Arc<dyn StorefrontApi>) -> Self {
        Self {
            api,
            current: None,
            loading: false,
            error: None,
        }
    }

    #[must_use]
    pub const fn current(&self) -> Option<&User> {
        self.current.as_ref()
    }

    #[must_use]
    pub const fn loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.loading = false;
        self.error = None;
    }

    fn begin(&mut self) -> Option<User> {
        self.loading = true;
        self.error = None;
        self.current.clone()
    }

    fn settle<T>(
        &mut self,
        snapshot: Option<User>,
        result: Result<T, ClientError>,
        action: &str,
    ) -> Result<T, ClientError> {
        self.loading = false;
        if let Err(e) = &result {
            tracing::warn!(error = %e, action, "User store operation failed");
            self.current = snapshot;
            self.error = Some(e.to_string());
        }
        result
    }

    /// Look a user up by email. A match becomes `current`; absence is not
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns the API error.
    pub async fn find_by_email(&mut self, email: &str) -> Result<Option<User>, ClientError> {
        let snapshot = self.begin();
        let result = self.api.find_user_by_email(email).await;
        let user = self.settle(snapshot, result, "find_by_email")?;
        if let Some(user) = &user {
            self.current = Some(user.clone());
        }
        Ok(user)
    }

    /// Hand an external login to the storefront and sign the user in.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] when email or name is blank,
    /// otherwise the API error.
    pub async fn login_with_identity(
        &mut self,
        identity: &ExternalIdentity,
    ) -> Result<User, ClientError> {
        let snapshot = self.begin();

        let result = if identity.email.trim().is_empty() || identity.name.trim().is_empty() {
            Err(ClientError::Validation(
                "Email and name are required".to_string(),
            ))
        } else {
            self.api.login(identity).await
        };

        let user = self.settle(snapshot, result, "login_with_identity")?;
        self.current = Some(user.clone());
        Ok(user)
    }

    /// Update profile fields. The signed-in copy is patched locally first
    /// and replaced by the server's row on success.
    ///
    /// # Errors
    ///
    /// Returns the API error after restoring the previous state.
    pub async fn update(&mut self, id: UserId, patch: &UserPatch) -> Result<User, ClientError> {
        let snapshot = self.begin();

        if let Some(user) = self.current.as_mut().filter(|u| u.id == id) {
            if let Some(name) = &patch.name {
                user.name.clone_from(name);
            }
            if let Some(picture) = &patch.picture {
                user.picture = Some(picture.clone());
            }
            if let Some(is_admin) = patch.is_admin {
                user.is_admin = is_admin;
            }
        }

        let result = self.api.update_user(id, patch).await;
        let user = self.settle(snapshot, result, "update")?;
        if self.current.as_ref().is_some_and(|u| u.id == id) {
            self.current = Some(user.clone());
        }
        Ok(user)
    }

    /// Ask the storefront whether a user is an administrator.
    ///
    /// # Errors
    ///
    /// Returns the API error, including not-found.
    pub async fn is_admin(&mut self, id: UserId) -> Result<bool, ClientError> {
        let snapshot = self.begin();
        let result = self.api.is_admin(id).await;
        self.settle(snapshot, result, "is_admin")
    }
}
