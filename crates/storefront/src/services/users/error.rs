//! User service error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::StorageError;

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] virtual_craft_core::EmailError),

    /// Input rejected before touching the record store.
    #[error("{0}")]
    Validation(String),

    /// User not found.
    #[error("user not found")]
    NotFound,

    /// A concurrent write claimed the same email.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Record store failure.
    #[error("storage failure: {0}")]
    Storage(#[source] StorageError),
}

impl From<RepositoryError> for UserError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Storage(StorageError::Records(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_conflict_stays_a_conflict() {
        let err = UserError::from(RepositoryError::Conflict("email taken".to_owned()));
        assert!(matches!(err, UserError::Conflict(ref msg) if msg == "email taken"));

        let err = UserError::from(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        assert!(matches!(err, UserError::Storage(_)));
    }
}
