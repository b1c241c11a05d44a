//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`,
//! and every error body uses the JSON envelope
//! `{"success": false, "data": null, "error": "<message>"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use virtual_craft_core::ApiResponse;

use crate::services::{CatalogError, UserError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Catalog operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// User operation failed.
    #[error("User error: {0}")]
    User(#[from] UserError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request body exceeds the configured limit.
    #[error("Payload too large")]
    PayloadTooLarge,

    /// A dependency is not ready to serve traffic.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Catalog(err) => match err {
                CatalogError::Validation(_) => StatusCode::BAD_REQUEST,
                CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
                CatalogError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
                CatalogError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::User(err) => match err {
                UserError::InvalidEmail(_) | UserError::Validation(_) => StatusCode::BAD_REQUEST,
                UserError::NotFound => StatusCode::NOT_FOUND,
                UserError::Conflict(_) => StatusCode::CONFLICT,
                UserError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show a client.
    fn public_message(&self) -> String {
        match self {
            Self::Catalog(err) => match err {
                CatalogError::Validation(msg) => msg.clone(),
                CatalogError::NotFound(_) => err.to_string(),
                CatalogError::Configuration(_) => "Image storage is not configured".to_string(),
                CatalogError::Storage(_) => "Internal server error".to_string(),
            },
            Self::User(err) => match err {
                UserError::InvalidEmail(_) => "Invalid email address".to_string(),
                UserError::Validation(msg) => msg.clone(),
                UserError::NotFound => "User not found".to_string(),
                UserError::Conflict(_) => "A user with this email already exists".to_string(),
                UserError::Storage(_) => "Internal server error".to_string(),
            },
            Self::NotFound(what) => format!("{what} not found"),
            Self::BadRequest(msg) => msg.clone(),
            Self::PayloadTooLarge => "Payload too large".to_string(),
            Self::Unavailable(_) => "Service unavailable".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let body = ApiResponse::<()>::error(self.public_message());
        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for catalog actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("catalog", "Uploaded image", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
