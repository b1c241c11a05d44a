//! HTTP client for the storefront JSON API.
//!
//! [`StorefrontApi`] is the seam the mirror stores talk through;
//! [`ApiClient`] implements it over `reqwest`. Every response is expected
//! in the `{success, data, error}` envelope.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, multipart};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use url::Url;

use virtual_craft_core::{
    ApiResponse, ExternalIdentity, ImageId, ImagePatch, NewProduct, Product, ProductDetails,
    ProductId, ProductImage, ProductPatch, ProductWithImages, ReorderImages, User, UserId,
    UserPatch,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_LOGGED_BODY: usize = 500;

/// Errors surfaced by the API client and the stores built on it.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not a valid envelope.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Server answered with a failure envelope.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Success envelope without the expected payload.
    #[error("response contained no data")]
    EmptyResponse,

    /// Input rejected before any request was sent.
    #[error("{0}")]
    Validation(String),

    /// Base URL could not be parsed.
    #[error("Invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// One file in a multipart image upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

/// Operations the mirror stores need from the storefront.
#[async_trait]
pub trait StorefrontApi: Send + Sync {
    async fn list_products(&self) -> Result<Vec<ProductWithImages>, ClientError>;
    async fn get_product(&self, id: ProductId) -> Result<ProductDetails, ClientError>;
    async fn create_product(&self, input: &NewProduct) -> Result<Product, ClientError>;
    async fn update_product(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Product, ClientError>;
    async fn delete_product(&self, id: ProductId) -> Result<(), ClientError>;

    async fn list_images(&self, product_id: ProductId) -> Result<Vec<ProductImage>, ClientError>;
    async fn upload_images(
        &self,
        product_id: ProductId,
        files: Vec<ImageUpload>,
    ) -> Result<Vec<ProductImage>, ClientError>;
    async fn update_image(
        &self,
        product_id: ProductId,
        image_id: ImageId,
        patch: ImagePatch,
    ) -> Result<ProductImage, ClientError>;
    async fn delete_image(
        &self,
        product_id: ProductId,
        image_id: ImageId,
    ) -> Result<(), ClientError>;
    async fn reorder_images(
        &self,
        product_id: ProductId,
        image_ids: &[ImageId],
    ) -> Result<Vec<ProductImage>, ClientError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ClientError>;
    async fn login(&self, identity: &ExternalIdentity) -> Result<User, ClientError>;
    async fn update_user(&self, id: UserId, patch: &UserPatch) -> Result<User, ClientError>;
    async fn is_admin(&self, id: UserId) -> Result<bool, ClientError>;
}

/// `reqwest`-backed storefront client.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a client for the storefront at `base_url`
    /// (e.g. `http://localhost:3000`).
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner { client, base_url }),
        })
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.inner.base_url.join(path)?)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        Ok(self.inner.client.request(method, self.url(path)?))
    }

    async fn send_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<Option<T>, ClientError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned + Send,
    {
        send(self.request(method, path)?.json(body)).await
    }

    async fn send_empty<T: DeserializeOwned + Send>(
        &self,
        method: Method,
        path: &str,
    ) -> Result<Option<T>, ClientError> {
        send(self.request(method, path)?).await
    }
}

/// Send a request and unwrap the response envelope.
async fn send<T: DeserializeOwned + Send>(request: RequestBuilder) -> Result<Option<T>, ClientError> {
    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;

    let envelope: ApiResponse<T> = match serde_json::from_str(&text) {
        Ok(envelope) => envelope,
        Err(e) if status.is_success() => {
            tracing::error!(
                error = %e,
                body = %text.chars().take(MAX_LOGGED_BODY).collect::<String>(),
                "Failed to parse storefront response"
            );
            return Err(ClientError::Parse(e));
        }
        Err(_) => {
            tracing::error!(
                status = %status,
                body = %text.chars().take(MAX_LOGGED_BODY).collect::<String>(),
                "Storefront returned non-envelope error"
            );
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: format!("HTTP {status}"),
            });
        }
    };

    envelope.into_optional().map_err(|message| {
        tracing::debug!(status = %status, %message, "Storefront request failed");
        ClientError::Api {
            status: status.as_u16(),
            message,
        }
    })
}

fn required<T>(data: Option<T>) -> Result<T, ClientError> {
    data.ok_or(ClientError::EmptyResponse)
}

#[async_trait]
impl StorefrontApi for ApiClient {
    async fn list_products(&self) -> Result<Vec<ProductWithImages>, ClientError> {
        required(self.send_empty(Method::GET, "api/products").await?)
    }

    async fn get_product(&self, id: ProductId) -> Result<ProductDetails, ClientError> {
        required(
            self.send_empty(Method::GET, &format!("api/products/{id}"))
                .await?,
        )
    }

    async fn create_product(&self, input: &NewProduct) -> Result<Product, ClientError> {
        required(self.send_json(Method::POST, "api/products", input).await?)
    }

    async fn update_product(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Product, ClientError> {
        required(
            self.send_json(Method::PATCH, &format!("api/products/{id}"), patch)
                .await?,
        )
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), ClientError> {
        self.send_empty::<()>(Method::DELETE, &format!("api/products/{id}"))
            .await?;
        Ok(())
    }

    async fn list_images(&self, product_id: ProductId) -> Result<Vec<ProductImage>, ClientError> {
        required(
            self.send_empty(Method::GET, &format!("api/products/{product_id}/images"))
                .await?,
        )
    }

    async fn upload_images(
        &self,
        product_id: ProductId,
        files: Vec<ImageUpload>,
    ) -> Result<Vec<ProductImage>, ClientError> {
        let mut form = multipart::Form::new();
        for file in files {
            let part = multipart::Part::bytes(file.bytes)
                .file_name(file.filename)
                .mime_str(&file.content_type)?;
            form = form.part("files", part);
        }

        let request = self
            .request(Method::POST, &format!("api/products/{product_id}/images"))?
            .multipart(form);
        required(send(request).await?)
    }

    async fn update_image(
        &self,
        product_id: ProductId,
        image_id: ImageId,
        patch: ImagePatch,
    ) -> Result<ProductImage, ClientError> {
        required(
            self.send_json(
                Method::PATCH,
                &format!("api/products/{product_id}/images/{image_id}"),
                &patch,
            )
            .await?,
        )
    }

    async fn delete_image(
        &self,
        product_id: ProductId,
        image_id: ImageId,
    ) -> Result<(), ClientError> {
        self.send_empty::<()>(
            Method::DELETE,
            &format!("api/products/{product_id}/images/{image_id}"),
        )
        .await?;
        Ok(())
    }

    async fn reorder_images(
        &self,
        product_id: ProductId,
        image_ids: &[ImageId],
    ) -> Result<Vec<ProductImage>, ClientError> {
        let body = ReorderImages {
            image_ids: image_ids.to_vec(),
        };
        required(
            self.send_json(
                Method::PUT,
                &format!("api/products/{product_id}/images/order"),
                &body,
            )
            .await?,
        )
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ClientError> {
        let mut url = self.url("api/users")?;
        url.query_pairs_mut().append_pair("email", email);
        send(self.inner.client.get(url)).await
    }

    async fn login(&self, identity: &ExternalIdentity) -> Result<User, ClientError> {
        required(self.send_json(Method::POST, "api/users", identity).await?)
    }

    async fn update_user(&self, id: UserId, patch: &UserPatch) -> Result<User, ClientError> {
        required(
            self.send_json(Method::PATCH, &format!("api/users/{id}"), patch)
                .await?,
        )
    }

    async fn is_admin(&self, id: UserId) -> Result<bool, ClientError> {
        required(
            self.send_empty(Method::GET, &format!("api/users/{id}/admin"))
                .await?,
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gains_trailing_slash() {
        let client = ApiClient::new("http://localhost:3000/shop").unwrap();
        assert_eq!(
            client.url("api/products").unwrap().as_str(),
            "http://localhost:3000/shop/api/products"
        );

        let client = ApiClient::new("http://localhost:3000").unwrap();
        assert_eq!(
            client.url("api/users").unwrap().as_str(),
            "http://localhost:3000/api/users"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            ApiClient::new("not a url"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_api_error_displays_server_message() {
        let err = ClientError::Api {
            status: 404,
            message: "Product 1 not found".to_string(),
        };
        assert_eq!(err.to_string(), "Product 1 not found");
    }
}
