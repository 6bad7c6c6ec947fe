// crates/studio-mcp-harness/src/artifact.rs
// ============================================================================
// Module: Configuration Artifact
// Description: Temporary configuration file consumed by the server under test.
// Purpose: Materialize the server config before startup and delete it after.
// Dependencies: serde, serde_json, tempfile, thiserror
// ============================================================================

//! ## Overview
//! The server under test owns its configuration schema; the harness only
//! produces a document pointing the server at the mock backend and passes the
//! file path as the server's single positional argument. The file lives in the
//! system temp directory and is removed on [`ConfigArtifact::remove`] or when
//! the artifact is dropped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Connection name the artifact selects as default.
pub const DEFAULT_CONNECTION: &str = "test_mock";

/// CLI distribution URL written into the artifact.
const CLI_DOWNLOAD_BASE_URL: &str =
    "https://distro.windriver.com/dist/wrstudio/wrstudio-cli-distro-cd";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Artifact write and cleanup errors.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// Serialization failed.
    #[error("config serialization failed: {0}")]
    Serialize(String),
    /// Filesystem error while writing or removing the file.
    #[error("config artifact io error: {0}")]
    Io(String),
}

// ============================================================================
// SECTION: Document Types
// ============================================================================

/// One named backend connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudioConnection {
    /// Display name.
    pub name: String,
    /// Backend base URL.
    pub url: String,
    /// Login user.
    pub username: String,
    /// Pre-issued token, if any.
    pub token: Option<String>,
}

/// Per-operation CLI timeouts in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationTimeouts {
    /// List/get operations.
    pub quick_operations: u64,
    /// Run/cancel operations.
    pub medium_operations: u64,
    /// Log/streaming operations.
    pub long_operations: u64,
    /// Raw network requests.
    pub network_requests: u64,
}

/// CLI section of the server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliSection {
    /// CLI distribution base URL.
    pub download_base_url: String,
    /// CLI version selector.
    pub version: String,
    /// CLI install directory override.
    pub install_dir: Option<String>,
    /// Legacy overall timeout in seconds.
    pub timeout: u64,
    /// Per-operation timeouts.
    pub timeouts: OperationTimeouts,
    /// Whether the server may update the CLI.
    pub auto_update: bool,
    /// Hours between update checks.
    pub update_check_interval: u64,
}

/// Cache section of the server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSection {
    /// Cache toggle.
    pub enabled: bool,
    /// Entry TTL in seconds.
    pub ttl: u64,
    /// Maximum cached items.
    pub max_size: usize,
}

/// Logging section of the server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Log level.
    pub level: String,
    /// Output format.
    pub format: String,
    /// File logging toggle.
    pub file_logging: bool,
    /// Log file path.
    pub log_file: Option<String>,
}

/// Configuration document consumed by the server under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudioConfig {
    /// Named backend connections.
    pub connections: BTreeMap<String, StudioConnection>,
    /// Connection used when a tool call does not name one.
    pub default_connection: Option<String>,
    /// CLI settings.
    pub cli: CliSection,
    /// Cache settings.
    pub cache: CacheSection,
    /// Logging settings.
    pub logging: LoggingSection,
}

impl StudioConfig {
    /// Builds the test configuration pointing at the mock backend.
    #[must_use]
    pub fn for_mock_backend(base_url: &str, username: &str) -> Self {
        let mut connections = BTreeMap::new();
        connections.insert(
            DEFAULT_CONNECTION.to_string(),
            StudioConnection {
                name: "Test Mock Server".to_string(),
                url: base_url.to_string(),
                username: username.to_string(),
                token: None,
            },
        );
        Self {
            connections,
            default_connection: Some(DEFAULT_CONNECTION.to_string()),
            cli: CliSection {
                download_base_url: CLI_DOWNLOAD_BASE_URL.to_string(),
                version: "auto".to_string(),
                install_dir: None,
                timeout: 300,
                timeouts: OperationTimeouts {
                    quick_operations: 10,
                    medium_operations: 30,
                    long_operations: 60,
                    network_requests: 10,
                },
                auto_update: false,
                update_check_interval: 24,
            },
            cache: CacheSection {
                enabled: true,
                ttl: 300,
                max_size: 1000,
            },
            logging: LoggingSection {
                level: "debug".to_string(),
                format: "pretty".to_string(),
                file_logging: false,
                log_file: None,
            },
        }
    }

    /// Returns the default connection, if the document names one.
    #[must_use]
    pub fn default_connection(&self) -> Option<&StudioConnection> {
        self.default_connection.as_ref().and_then(|name| self.connections.get(name))
    }
}

// ============================================================================
// SECTION: Artifact Handle
// ============================================================================

/// Owned temporary file holding a serialized [`StudioConfig`].
#[derive(Debug)]
pub struct ConfigArtifact {
    /// Backing temp file; deleted on close or drop.
    file: NamedTempFile,
}

impl ConfigArtifact {
    /// Writes `config` as pretty JSON into a new temporary file.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] when serialization or the write fails.
    pub fn write(config: &StudioConfig) -> Result<Self, ArtifactError> {
        let payload = serde_json::to_vec_pretty(config)
            .map_err(|err| ArtifactError::Serialize(err.to_string()))?;
        let mut file = tempfile::Builder::new()
            .prefix("studio-mcp-harness-")
            .suffix(".json")
            .tempfile()
            .map_err(|err| ArtifactError::Io(err.to_string()))?;
        file.write_all(&payload).map_err(|err| ArtifactError::Io(err.to_string()))?;
        file.flush().map_err(|err| ArtifactError::Io(err.to_string()))?;
        Ok(Self {
            file,
        })
    }

    /// Returns the artifact path passed to the server under test.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Deletes the artifact file.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::Io`] when the file cannot be removed.
    pub fn remove(self) -> Result<(), ArtifactError> {
        self.file.close().map_err(|err| ArtifactError::Io(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "Test-only assertions.")]

    use super::ConfigArtifact;
    use super::DEFAULT_CONNECTION;
    use super::StudioConfig;

    #[test]
    fn artifact_round_trips_default_connection() {
        let config = StudioConfig::for_mock_backend("http://127.0.0.1:8080", "admin");
        let artifact = ConfigArtifact::write(&config).expect("artifact write");
        let text = std::fs::read_to_string(artifact.path()).expect("artifact read");
        let parsed: StudioConfig = serde_json::from_str(&text).expect("artifact parse");
        let connection = parsed.default_connection().expect("default connection");
        assert_eq!(parsed.default_connection.as_deref(), Some(DEFAULT_CONNECTION));
        assert_eq!(connection.url, "http://127.0.0.1:8080");
        assert!(!parsed.cli.auto_update);
    }

    #[test]
    fn remove_deletes_the_file() {
        let config = StudioConfig::for_mock_backend("http://127.0.0.1:8080", "admin");
        let artifact = ConfigArtifact::write(&config).expect("artifact write");
        let path = artifact.path().to_path_buf();
        assert!(path.exists());
        artifact.remove().expect("artifact remove");
        assert!(!path.exists());
    }
}
