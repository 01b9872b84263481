// Ingest configuration file

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::upload::{Skip32Obfuscator, DEFAULT_PART_SIZE};

/// Smallest part size object stores generally accept, except for the last part
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024; // 5MB

/// Errors raised while loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {message}")]
    Invalid { message: String },
}

/// Settings shared by the upload client and the local service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    /// Base URL under which the `/upload/...` endpoints live
    pub endpoint: Option<String>,

    /// Size of every part except the last (bytes)
    pub part_size: u64,

    /// Per-request timeout for the HTTP transport
    pub request_timeout_secs: u64,

    /// Prefix of object storage keys
    pub key_prefix: String,

    /// Key of the content id permutation, 20 hex digits
    pub id_key: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            part_size: DEFAULT_PART_SIZE,
            request_timeout_secs: 60,
            key_prefix: "content/".to_string(),
            id_key: "736f756e647363617065".to_string(),
        }
    }
}

impl IngestConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate a JSON config file; missing keys take their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: IngestConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_part_size(mut self, bytes: u64) -> Self {
        self.part_size = bytes;
        self
    }

    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.part_size < MIN_PART_SIZE {
            return Err(ConfigError::Invalid {
                message: format!(
                    "part_size {} is below the {} byte minimum",
                    self.part_size, MIN_PART_SIZE
                ),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                message: "request_timeout_secs must be positive".to_string(),
            });
        }
        self.id_obfuscator()?;
        Ok(())
    }

    /// Content id permutation keyed by `id_key`
    pub fn id_obfuscator(&self) -> Result<Skip32Obfuscator, ConfigError> {
        Skip32Obfuscator::from_hex(&self.id_key).map_err(|e| ConfigError::Invalid {
            message: format!("id_key must be 20 hex digits: {e}"),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::{ContentId, ContentIdObfuscator};

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("{}-{}.json", name, std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = IngestConfig::new();
        assert_eq!(config.part_size, 8 * 1024 * 1024);
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let path = write_temp("ingest-partial", r#"{ "endpoint": "https://admin.example/cmd" }"#);
        let config = IngestConfig::from_file(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.endpoint.as_deref(), Some("https://admin.example/cmd"));
        assert_eq!(config.part_size, DEFAULT_PART_SIZE);
        assert_eq!(config.key_prefix, "content/");
    }

    #[test]
    fn test_default_id_key_is_valid() {
        let ids = IngestConfig::new().id_obfuscator().unwrap();
        let same = Skip32Obfuscator::new(*b"soundscape");
        assert_eq!(ids.obfuscate(ContentId(12)), same.obfuscate(ContentId(12)));
    }

    #[test]
    fn test_rejects_bad_files() {
        let path = write_temp("ingest-small-part", r#"{ "part_size": 1024 }"#);
        let err = IngestConfig::from_file(&path).unwrap_err();
        fs::remove_file(&path).unwrap();
        assert!(matches!(err, ConfigError::Invalid { .. }));

        let path = write_temp("ingest-unknown-key", r#"{ "partsize": 1024 }"#);
        let err = IngestConfig::from_file(&path).unwrap_err();
        fs::remove_file(&path).unwrap();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let path = write_temp("ingest-bad-key", r#"{ "id_key": "not hex" }"#);
        let err = IngestConfig::from_file(&path).unwrap_err();
        fs::remove_file(&path).unwrap();
        assert!(matches!(err, ConfigError::Invalid { .. }));

        let err = IngestConfig::from_file("/nonexistent/ingest.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_builders() {
        let config = IngestConfig::new()
            .with_endpoint("http://localhost:8787")
            .with_part_size(16 * 1024 * 1024)
            .with_request_timeout_secs(5);
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:8787"));
        assert_eq!(config.part_size, 16 * 1024 * 1024);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
    }
}
