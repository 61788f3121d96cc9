//! Script downloads
//!
//! Storage URLs are read with the instance's credentials first; anything
//! else, or a failed authenticated read, is fetched with a plain HTTP GET of
//! the reference exactly as the operator wrote it.

use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, info};

use super::url::find_match;
use crate::storage::{GcsStore, ObjectStore};
use crate::{Config, ScriptError};

/// Downloads script bodies referenced by URL
pub struct ScriptFetcher {
    store: Arc<dyn ObjectStore>,
    client: Client,
}

impl ScriptFetcher {
    /// Fetcher backed by Cloud Storage and a fresh HTTP client
    pub fn new(config: &Config) -> Result<Self, ScriptError> {
        let store = GcsStore::new(config)?;
        let client = Client::builder()
            .timeout(config.download_timeout())
            .build()?;
        Ok(Self::with_parts(Arc::new(store), client))
    }

    /// Create with an explicit object store and HTTP client
    pub fn with_parts(store: Arc<dyn ObjectStore>, client: Client) -> Self {
        Self { store, client }
    }

    /// Download the script a reference points at
    ///
    /// The body is returned as raw bytes; batch files are often not UTF-8.
    pub async fn fetch(&self, reference: &str) -> Result<Vec<u8>, ScriptError> {
        if let Some(object) = find_match(reference) {
            match self.store.read_object(&object.bucket, &object.object).await {
                Ok(script) => return Ok(script),
                Err(e) => {
                    info!("Failed to download GCS path: {}", e);
                    info!("Trying unauthenticated download");
                }
            }
        }

        self.download_url(reference).await
    }

    /// Unauthenticated GET of the reference, verbatim
    async fn download_url(&self, url: &str) -> Result<Vec<u8>, ScriptError> {
        debug!("Downloading script: {}", url);
        let response = self.client.get(url).send().await?;

        if response.status().is_success() {
            Ok(response.bytes().await?.to_vec())
        } else {
            Err(ScriptError::download(url, response.status().to_string()))
        }
    }
}
