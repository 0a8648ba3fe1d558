//! Object storage client.
//!
//! Uploads go to a managed storage REST endpoint
//! (`POST {base}/storage/v1/object/{bucket}/{path}`) authenticated with the service
//! key; the returned value is the object's public URL.

use crate::{
    config::settings::StorageConfig,
    errors::{Error, Result},
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Client for the storage service.
#[derive(Debug, Clone)]
pub struct StorageClient {
    http: reqwest::Client,
    base_url: String,
    service_key: Option<String>,
    product_bucket: String,
    curriculum_bucket: String,
}

impl StorageClient {
    /// Creates a client from the `[storage]` settings and an optional service key.
    #[must_use]
    pub fn new(config: &StorageConfig, service_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            service_key: service_key.filter(|key| !key.trim().is_empty()),
            product_bucket: config.product_bucket.clone(),
            curriculum_bucket: config.curriculum_bucket.clone(),
        }
    }

    /// Creates a client reading the key from `STORAGE_SERVICE_KEY`.
    #[must_use]
    pub fn from_env(config: &StorageConfig) -> Self {
        let service_key = std::env::var("STORAGE_SERVICE_KEY").ok();
        if service_key.is_none() {
            warn!("STORAGE_SERVICE_KEY not set; uploads will fail");
        }
        Self::new(config, service_key)
    }

    /// Bucket holding product images.
    #[must_use]
    pub fn product_bucket(&self) -> &str {
        &self.product_bucket
    }

    /// Bucket holding curriculum documents.
    #[must_use]
    pub fn curriculum_bucket(&self) -> &str {
        &self.curriculum_bucket
    }

    /// Public URL of an object.
    #[must_use]
    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{bucket}/{path}", self.base_url)
    }

    /// Uploads `bytes` to `bucket/path`, replacing any existing object, and returns
    /// its public URL.
    ///
    /// # Errors
    /// Returns an error if:
    /// - No service key is configured
    /// - The request cannot be sent
    /// - The service answers with a non-success status
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String> {
        let Some(key) = self.service_key.as_deref() else {
            return Err(Error::Storage {
                message: "STORAGE_SERVICE_KEY is not configured".to_string(),
            });
        };

        let response = self
            .http
            .post(format!("{}/storage/v1/object/{bucket}/{path}", self.base_url))
            .bearer_auth(key)
            .header("apikey", key)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Storage {
                message: format!("{status}: {body}"),
            });
        }

        let url = self.public_url(bucket, path);
        info!("Uploaded {}", url);
        Ok(url)
    }
}

/// Reduces a client-supplied file name to `[a-z0-9._-]`.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    // Only the final component; clients sometimes send full paths
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let mut cleaned = String::with_capacity(base.len());
    for c in base.trim().chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() || c == '.' || c == '_' {
            cleaned.push(c);
        } else if !cleaned.ends_with('-') {
            cleaned.push('-');
        }
    }
    let cleaned = cleaned.trim_matches(|c| c == '-' || c == '.').to_string();
    if cleaned.is_empty() { "file".to_string() } else { cleaned }
}

/// Unique object path for an upload under `prefix`.
#[must_use]
pub fn object_path(prefix: &str, file_name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let unique = Uuid::new_v4().simple();
    let name = sanitize_file_name(file_name);
    if prefix.is_empty() {
        format!("{unique}-{name}")
    } else {
        format!("{prefix}/{unique}-{name}")
    }
}
