//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_STORAGE_BACKEND` - `local` or `supabase` (default: local)
//! - `STOREFRONT_STORAGE_BUCKET` - Image container name (default: product-images)
//! - `STOREFRONT_MEDIA_DIR` - Root directory for the local backend (default: media)
//! - `STOREFRONT_MAX_UPLOAD_BYTES` - Request body limit for uploads (default: 10 MiB)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.1)
//!
//! ## Required when `STOREFRONT_STORAGE_BACKEND=supabase`
//! - `SUPABASE_URL` - Project URL (e.g., <https://abc.supabase.co>)
//! - `SUPABASE_SERVICE_KEY` - Service-role key (validated for entropy)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront, without a trailing slash
    pub base_url: String,
    /// Image object storage
    pub storage: StorageConfig,
    /// Maximum accepted request body for image uploads
    pub max_upload_bytes: usize,
    /// Sentry error tracking
    pub sentry: SentryConfig,
}

/// Where product image blobs are stored.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Container (bucket) holding product images
    pub bucket: String,
    pub backend: StorageBackend,
}

/// Object storage backend selection.
///
/// Implements `Debug` manually to redact the service key.
#[derive(Clone)]
pub enum StorageBackend {
    /// Files below `media_dir/{bucket}/`, served under `/media`
    Local { media_dir: PathBuf },
    /// Supabase Storage REST API
    Supabase {
        url: String,
        service_key: SecretString,
    },
}

impl std::fmt::Debug for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local { media_dir } => f
                .debug_struct("Local")
                .field("media_dir", media_dir)
                .finish(),
            Self::Supabase { url, .. } => f
                .debug_struct("Supabase")
                .field("url", url)
                .field("service_key", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Sentry error tracking configuration.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = normalize_base_url(
            "STOREFRONT_BASE_URL",
            &get_required_env("STOREFRONT_BASE_URL")?,
        )?;
        let storage = StorageConfig::from_env()?;
        let max_upload_bytes = parse_env(
            "STOREFRONT_MAX_UPLOAD_BYTES",
            &DEFAULT_MAX_UPLOAD_BYTES.to_string(),
        )?;
        let sentry = SentryConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            storage,
            max_upload_bytes,
            sentry,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl StorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let bucket = get_env_or_default("STOREFRONT_STORAGE_BUCKET", "product-images");
        let kind = get_env_or_default("STOREFRONT_STORAGE_BACKEND", "local");

        let backend = match parse_backend_kind(&kind)? {
            BackendKind::Local => StorageBackend::Local {
                media_dir: PathBuf::from(get_env_or_default("STOREFRONT_MEDIA_DIR", "media")),
            },
            BackendKind::Supabase => StorageBackend::Supabase {
                url: normalize_base_url("SUPABASE_URL", &get_required_env("SUPABASE_URL")?)?,
                service_key: get_validated_secret("SUPABASE_SERVICE_KEY")?,
            },
        };

        Ok(Self { bucket, backend })
    }
}

impl SentryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackendKind {
    Local,
    Supabase,
}

fn parse_backend_kind(value: &str) -> Result<BackendKind, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "local" => Ok(BackendKind::Local),
        "supabase" => Ok(BackendKind::Supabase),
        other => Err(ConfigError::InvalidEnvVar(
            "STOREFRONT_STORAGE_BACKEND".to_string(),
            format!("expected 'local' or 'supabase', got '{other}'"),
        )),
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Check that `value` is an absolute http(s) URL and strip any trailing slash.
fn normalize_base_url(key: &str, value: &str) -> Result<String, ConfigError> {
    let url =
        Url::parse(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(value.trim_end_matches('/').to_string())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Real keys (JWTs, API tokens) have high entropy
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key issued by the provider."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        // All same character = 0 entropy
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-service-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_backend_kind() {
        assert_eq!(parse_backend_kind("local").unwrap(), BackendKind::Local);
        assert_eq!(
            parse_backend_kind(" Supabase ").unwrap(),
            BackendKind::Supabase
        );
        assert!(matches!(
            parse_backend_kind("s3"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("K", "https://shop.example/").unwrap(),
            "https://shop.example"
        );
        assert!(normalize_base_url("K", "not a url").is_err());
        assert!(normalize_base_url("K", "ftp://shop.example").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            storage: StorageConfig {
                bucket: "product-images".to_string(),
                backend: StorageBackend::Local {
                    media_dir: PathBuf::from("media"),
                },
            },
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            sentry: SentryConfig::default(),
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_storage_backend_debug_redacts_key() {
        let backend = StorageBackend::Supabase {
            url: "https://abc.supabase.co".to_string(),
            service_key: SecretString::from("super_secret_service_key"),
        };

        let debug_output = format!("{backend:?}");
        assert!(debug_output.contains("abc.supabase.co"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_service_key"));
    }
}
