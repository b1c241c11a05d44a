//! Supabase Storage REST client.
//!
//! Uses the service-role key, so it bypasses bucket policies. Never hand this
//! client's key to a browser.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{ObjectStore, ObjectStoreError, validate_path};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Object store backed by a Supabase Storage bucket.
#[derive(Clone)]
pub struct SupabaseObjectStore {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
}

impl std::fmt::Debug for SupabaseObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseObjectStore")
            .field("base_url", &self.base_url)
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct Bucket {
    name: String,
}

impl SupabaseObjectStore {
    /// Create a new Supabase Storage client.
    ///
    /// # Errors
    ///
    /// Returns error if the service key is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(
        url: &str,
        service_key: &SecretString,
        bucket: impl Into<String>,
    ) -> Result<Self, ObjectStoreError> {
        let mut headers = HeaderMap::new();

        let key = service_key.expose_secret();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|e| ObjectStoreError::Configuration(format!("invalid service key: {e}")))?;
        bearer.set_sensitive(true);
        headers.insert("Authorization", bearer);

        let mut apikey = HeaderValue::from_str(key)
            .map_err(|e| ObjectStoreError::Configuration(format!("invalid service key: {e}")))?;
        apikey.set_sensitive(true);
        headers.insert("apikey", apikey);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_owned(),
            bucket: bucket.into(),
        })
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            urlencoding::encode(&self.bucket),
            encode_path(path)
        )
    }
}

/// Percent-encode each segment of a slash-separated key.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ObjectStoreError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(ObjectStoreError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response)
}

#[async_trait]
impl ObjectStore for SupabaseObjectStore {
    fn container(&self) -> &str {
        &self.bucket
    }

    async fn list_containers(&self) -> Result<Vec<String>, ObjectStoreError> {
        let url = format!("{}/storage/v1/bucket", self.base_url);
        let response = check_status(self.client.get(&url).send().await?).await?;
        let buckets: Vec<Bucket> = response.json().await?;
        Ok(buckets.into_iter().map(|b| b.name).collect())
    }

    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        validate_path(path)?;
        let response = self
            .client
            .post(self.object_url(path))
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            urlencoding::encode(&self.bucket),
            encode_path(path)
        )
    }

    async fn remove(&self, paths: &[String]) -> Result<(), ObjectStoreError> {
        if paths.is_empty() {
            return Ok(());
        }
        for path in paths {
            validate_path(path)?;
        }

        let url = format!(
            "{}/storage/v1/object/{}",
            self.base_url,
            urlencoding::encode(&self.bucket)
        );
        let body = serde_json::json!({ "prefixes": paths });
        let response = self.client.delete(&url).json(&body).send().await?;
        check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store() -> SupabaseObjectStore {
        SupabaseObjectStore::new(
            "https://abc.supabase.co/",
            &SecretString::from("k3y-Zx9!qP2#wL7"),
            "product-images",
        )
        .unwrap()
    }

    #[test]
    fn test_public_url() {
        assert_eq!(
            store().public_url("products/p1/1700000000000-my vase.jpg"),
            "https://abc.supabase.co/storage/v1/object/public/product-images/products/p1/1700000000000-my%20vase.jpg"
        );
    }

    #[test]
    fn test_object_url_keeps_slashes() {
        assert_eq!(
            store().object_url("products/p1/a.jpg"),
            "https://abc.supabase.co/storage/v1/object/product-images/products/p1/a.jpg"
        );
    }

    #[test]
    fn test_debug_hides_key() {
        let debug = format!("{:?}", store());
        assert!(debug.contains("product-images"));
        assert!(!debug.contains("k3y-Zx9"));
    }
}
