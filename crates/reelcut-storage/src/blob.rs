//! Blob storage over HTTP.
//!
//! Objects are written with a single authenticated `PUT {base}/{name}`; the
//! service answers with JSON carrying the public `url`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::store::{unique_name, validate_filename, ArtifactStore};

/// Default blob service endpoint.
pub const DEFAULT_BLOB_BASE_URL: &str = "https://blob.vercel-storage.com";

/// Request timeout for a single upload.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Deserialize)]
struct PutResponse {
    #[serde(default)]
    url: Option<String>,
}

/// Bearer-token blob store client.
#[derive(Clone)]
pub struct BlobStore {
    client: Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for BlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStore").field("base_url", &self.base_url).finish()
    }
}

impl BlobStore {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> StorageResult<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(StorageError::config_error("blob token is empty"));
        }

        let client = Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .map_err(|e| StorageError::config_error(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ArtifactStore for BlobStore {
    fn name(&self) -> &'static str {
        "blob"
    }

    async fn upload(&self, bytes: Vec<u8>, filename: &str, content_type: &str) -> StorageResult<String> {
        validate_filename(filename)?;
        let object = unique_name(filename);
        let url = format!("{}/{}", self.base_url, object);
        let size = bytes.len();

        debug!(object = %object, size = size, content_type = content_type, "Uploading blob");

        let response = self
            .client
            .put(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(CONTENT_TYPE, content_type)
            .header("x-content-type", content_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: PutResponse = response
            .json()
            .await
            .map_err(|e| StorageError::InvalidResponse(format!("unparseable upload response: {}", e)))?;

        let public_url = parsed
            .url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| StorageError::InvalidResponse("upload response has no url".to_string()))?;

        info!(object = %object, size = size, url = %public_url, "Uploaded blob");
        Ok(public_url)
    }
}
