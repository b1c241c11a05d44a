//! JSON response envelope used by every storefront API endpoint.
//!
//! ```json
//! { "success": true,  "data": { ... } }
//! { "success": false, "error": "Product not found" }
//! ```

use serde::{Deserialize, Serialize};

/// Uniform API response wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// A successful response carrying `data`.
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// A failed response carrying an error message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Unwrap the payload, turning a failure envelope into its message.
    ///
    /// A success envelope whose `data` is `null` is treated as an error; use
    /// [`ApiResponse::into_optional`] for endpoints where absence is valid.
    ///
    /// # Errors
    ///
    /// Returns the error message if `success` is false or `data` is missing.
    pub fn into_result(self) -> Result<T, String> {
        self.into_optional()?
            .ok_or_else(|| "response contained no data".to_string())
    }

    /// Unwrap a payload that may legitimately be absent.
    ///
    /// # Errors
    ///
    /// Returns the error message if `success` is false.
    pub fn into_optional(self) -> Result<Option<T>, String> {
        if self.success {
            Ok(self.data)
        } else {
            Err(self.error.unwrap_or_else(|| "unknown error".to_string()))
        }
    }
}
