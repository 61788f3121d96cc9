//! Authenticated Cloud Storage reads
//!
//! The fetcher only needs "read this object with the instance's credentials".
//! [`ObjectStore`] is that seam; [`GcsStore`] is the production implementation
//! backed by the instance's default service account.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use crate::{Config, ScriptError};

/// Required header for GCE metadata requests
const METADATA_FLAVOR_HEADER: &str = "Metadata-Flavor";
const METADATA_FLAVOR_VALUE: &str = "Google";

/// Trait for authenticated object storage access
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read an object's full contents
    async fn read_object(&self, bucket: &str, object: &str) -> Result<Vec<u8>, ScriptError>;
}

/// Access token issued by the metadata server for the default service account
#[derive(Debug, Deserialize)]
struct AccessToken {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
}

/// Cloud Storage client authenticated as the instance's service account
pub struct GcsStore {
    client: Client,
    metadata_url: String,
    storage_url: String,
}

impl GcsStore {
    pub fn new(config: &Config) -> Result<Self, ScriptError> {
        let client = Client::builder()
            .timeout(config.download_timeout())
            .build()?;

        Ok(Self {
            client,
            metadata_url: config.metadata_url.trim_end_matches('/').to_string(),
            storage_url: config.storage_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch an access token for the default service account
    async fn access_token(&self) -> Result<AccessToken, ScriptError> {
        let url = format!(
            "{}/instance/service-accounts/default/token",
            self.metadata_url
        );
        debug!("Fetching service account token: {}", url);

        let response = self
            .client
            .get(&url)
            .header(METADATA_FLAVOR_HEADER, METADATA_FLAVOR_VALUE)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ScriptError::Metadata(format!(
                "Failed to fetch service account token: {}",
                response.status()
            )));
        }

        Ok(response.json().await?)
    }

    /// Media download URL for an object; the object name is one encoded path segment
    fn object_url(&self, bucket: &str, object: &str) -> Result<Url, ScriptError> {
        let mut url = Url::parse(&self.storage_url)
            .map_err(|e| ScriptError::Config(format!("invalid storage_url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ScriptError::Config("storage_url cannot be a base".to_string()))?
            .extend(["b", bucket, "o", object]);
        url.query_pairs_mut().append_pair("alt", "media");
        Ok(url)
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn read_object(&self, bucket: &str, object: &str) -> Result<Vec<u8>, ScriptError> {
        let token = self.access_token().await?;
        let url = self.object_url(bucket, object)?;
        debug!("Reading gs://{}/{}", bucket, object);

        let response = self
            .client
            .get(url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!(
                    "{} {}",
                    token.token_type.as_deref().unwrap_or("Bearer"),
                    token.access_token
                ),
            )
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.bytes().await?.to_vec())
        } else {
            Err(ScriptError::storage(
                bucket,
                object,
                response.status().to_string(),
            ))
        }
    }
}
