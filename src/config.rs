//! Runtime configuration
//!
//! Built once at process start and handed to every component by reference.
//! Defaults target the GCE metadata server; an optional YAML file named by
//! `METADATA_SCRIPTS_CONFIG` can override any field.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::ScriptError;

/// Environment variable naming an optional YAML config file
pub const CONFIG_ENV: &str = "METADATA_SCRIPTS_CONFIG";

/// GCE metadata service base URL
pub const DEFAULT_METADATA_URL: &str = "http://metadata.google.internal/computeMetadata/v1";

/// Cloud Storage JSON API base URL
pub const DEFAULT_STORAGE_URL: &str = "https://storage.googleapis.com/storage/v1";

/// Interpreter used for PowerShell scripts
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Interpreter {
    /// Program to execute
    pub program: String,
    /// Arguments placed before the script path
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self {
            program: "powershell.exe".to_string(),
            args: ["-NoProfile", "-NoLogo", "-ExecutionPolicy", "Unrestricted", "-File"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Immutable configuration for a single run
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Metadata service base URL (up to and including `/computeMetadata/v1`)
    pub metadata_url: String,

    /// Cloud Storage JSON API base URL
    pub storage_url: String,

    /// Client-side timeout for the attributes query, in seconds
    pub metadata_timeout_secs: u64,

    /// Server-side long-poll for the attributes query, in seconds
    pub metadata_hang_secs: u64,

    /// Client-side timeout for script downloads, in seconds
    ///
    /// Covers both the authenticated storage read and the plain HTTP fallback.
    pub download_timeout_secs: u64,

    /// Prefix of the per-script temporary directory
    pub temp_prefix: String,

    /// PowerShell interpreter invocation
    pub powershell: Interpreter,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            metadata_url: DEFAULT_METADATA_URL.to_string(),
            storage_url: DEFAULT_STORAGE_URL.to_string(),
            metadata_timeout_secs: 20,
            metadata_hang_secs: 10,
            download_timeout_secs: 60,
            temp_prefix: "metadata-scripts".to_string(),
            powershell: Interpreter::default(),
        }
    }
}

impl Config {
    /// Parse a config from YAML, filling unset fields with defaults
    pub fn from_yaml(content: &str) -> Result<Self, ScriptError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load a config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScriptError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        debug!("Loaded config from {}", path.display());
        Self::from_yaml(&content)
    }

    /// Load from the file named by [`CONFIG_ENV`], or use defaults
    pub fn load() -> Result<Self, ScriptError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => Self::from_file(path),
            _ => Ok(Self::default()),
        }
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}
