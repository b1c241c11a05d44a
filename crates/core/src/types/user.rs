//! User models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::UserId;

/// A storefront user, created from the first external login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct User {
    pub id: UserId,
    /// Unique identity key.
    pub email: Email,
    pub name: String,
    pub picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
    pub is_admin: bool,
}

/// The profile handed over by the external identity provider after login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIdentity {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub picture: Option<String>,
}

/// Partial user update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
}

impl UserPatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.picture.is_none() && self.is_admin.is_none()
    }
}
