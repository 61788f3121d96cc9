//! Instance attributes query
//!
//! Fetches every instance attribute in one recursive JSON request.
//! <https://cloud.google.com/compute/docs/metadata/querying-metadata>

use reqwest::Client;
use std::collections::HashMap;
use tracing::debug;

use crate::{Config, ScriptError};

/// Required header for GCE metadata requests
const METADATA_FLAVOR_HEADER: &str = "Metadata-Flavor";
const METADATA_FLAVOR_VALUE: &str = "Google";

/// Client for the metadata server's instance attributes
pub struct MetadataClient {
    client: Client,
    base_url: String,
    hang_secs: u64,
}

impl MetadataClient {
    pub fn new(config: &Config) -> Result<Self, ScriptError> {
        let client = Client::builder()
            .timeout(config.metadata_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.metadata_url.trim_end_matches('/').to_string(),
            hang_secs: config.metadata_hang_secs,
        })
    }

    /// Attributes URL with the long-poll query
    ///
    /// `last_etag=NONE` makes the server answer as soon as it has any state.
    pub fn attributes_url(&self) -> String {
        format!(
            "{}/instance/attributes/?recursive=true&alt=json&timeout_sec={}&last_etag=NONE",
            self.base_url, self.hang_secs
        )
    }

    /// Fetch all instance attributes as a flat map
    pub async fn get_attributes(&self) -> Result<HashMap<String, String>, ScriptError> {
        let url = self.attributes_url();
        debug!("Fetching instance attributes: {}", url);

        let response = self
            .client
            .get(&url)
            .header(METADATA_FLAVOR_HEADER, METADATA_FLAVOR_VALUE)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ScriptError::Metadata(format!(
                "Failed to fetch instance attributes: {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_url() {
        let client = MetadataClient::new(&Config::default()).unwrap();
        assert_eq!(
            client.attributes_url(),
            "http://metadata.google.internal/computeMetadata/v1/instance/attributes/?recursive=true&alt=json&timeout_sec=10&last_etag=NONE"
        );
    }

    #[test]
    fn test_trailing_slash_in_base_url() {
        let config = Config {
            metadata_url: "http://127.0.0.1:9000/computeMetadata/v1/".to_string(),
            metadata_hang_secs: 2,
            ..Default::default()
        };
        let client = MetadataClient::new(&config).unwrap();
        assert_eq!(
            client.attributes_url(),
            "http://127.0.0.1:9000/computeMetadata/v1/instance/attributes/?recursive=true&alt=json&timeout_sec=2&last_etag=NONE"
        );
    }
}
