//! Error types for metadata-scripts

use thiserror::Error;

/// Main error type for metadata script operations
#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("error getting script type from url path, path: {path:?}, parsed type: {suffix:?}")]
    UnrecognizedExtension { path: String, suffix: String },

    #[error("Storage error for gs://{bucket}/{object}: {message}")]
    Storage {
        bucket: String,
        object: String,
        message: String,
    },

    #[error("Download of {url} failed: {message}")]
    Download { url: String, message: String },

    #[error("Script {0} is a URL pointer and must be resolved before it can run")]
    Unresolved(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ScriptError {
    /// Create a storage error
    pub fn storage(
        bucket: impl Into<String>,
        object: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Storage {
            bucket: bucket.into(),
            object: object.into(),
            message: message.into(),
        }
    }

    /// Create a download error
    pub fn download(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Download {
            url: url.into(),
            message: message.into(),
        }
    }
}
