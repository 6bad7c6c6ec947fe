// crates/studio-mcp-harness/src/config/settings.rs
// ============================================================================
// Module: Harness Settings
// Description: Typed settings for the server under test and the mock backend.
// Purpose: Resolve defaults, settings files, and env overrides into one value.
// Dependencies: serde, toml, thiserror
// ============================================================================

//! ## Overview
//! Durations are stored as integer milliseconds so settings files stay plain
//! TOML; accessors convert them to [`Duration`] values. The global timeout
//! floor from the environment is applied to response and startup deadlines.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use super::env::EnvOverrides;
use crate::timeouts;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Settings resolution errors.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("failed to read settings file {path}: {message}")]
    Read {
        /// Settings file path.
        path: PathBuf,
        /// Underlying I/O error message.
        message: String,
    },
    /// The settings file is not valid TOML for [`HarnessSettings`].
    #[error("invalid settings file {path}: {message}")]
    Parse {
        /// Settings file path.
        path: PathBuf,
        /// Parser error message.
        message: String,
    },
    /// An environment override is invalid.
    #[error("environment error: {0}")]
    Env(String),
    /// Settings are structurally invalid.
    #[error("invalid settings: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Settings Types
// ============================================================================

/// Settings for the server-under-test process.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    /// Executable path of the server under test.
    pub binary: PathBuf,
    /// Arguments placed before the configuration artifact path.
    pub args: Vec<String>,
    /// Settle delay after spawn, in milliseconds.
    pub settle_delay_ms: u64,
    /// Grace period before a forced kill, in milliseconds.
    pub stop_grace_ms: u64,
    /// Deadline for one response line, in milliseconds.
    pub response_timeout_ms: u64,
    /// Optional file receiving the child's stderr; inherited when unset.
    pub stderr_log: Option<PathBuf>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("target/release/studio-mcp-server"),
            args: Vec::new(),
            settle_delay_ms: duration_ms(timeouts::SERVER_SETTLE_DELAY),
            stop_grace_ms: duration_ms(timeouts::SERVER_STOP_GRACE),
            response_timeout_ms: duration_ms(timeouts::RESPONSE_TIMEOUT),
            stderr_log: None,
        }
    }
}

/// Settings for the mock backend service group.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendSettings {
    /// Whether the harness owns the backend lifecycle.
    pub managed: bool,
    /// Working directory for the orchestration commands.
    pub workdir: PathBuf,
    /// Base URL of the backend (no trailing slash).
    pub base_url: String,
    /// Health endpoint path.
    pub health_path: String,
    /// Bring-up command and arguments.
    pub up_command: Vec<String>,
    /// Tear-down command and arguments (including volume cleanup).
    pub down_command: Vec<String>,
    /// Settle delay after bring-up, in milliseconds.
    pub settle_delay_ms: u64,
    /// Per-probe HTTP timeout, in milliseconds.
    pub probe_timeout_ms: u64,
    /// Total health-gated startup budget, in milliseconds.
    pub startup_timeout_ms: u64,
    /// Interval between startup health probes, in milliseconds.
    pub poll_interval_ms: u64,
    /// Username for the token endpoint.
    pub username: String,
    /// Password for the token endpoint.
    pub password: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            managed: true,
            workdir: PathBuf::from("mock-studio-server"),
            base_url: "http://localhost:8080".to_string(),
            health_path: "/api/health".to_string(),
            up_command: vec!["docker-compose".to_string(), "up".to_string(), "-d".to_string()],
            down_command: vec!["docker-compose".to_string(), "down".to_string(), "-v".to_string()],
            settle_delay_ms: duration_ms(timeouts::BACKEND_SETTLE_DELAY),
            probe_timeout_ms: duration_ms(timeouts::BACKEND_PROBE_TIMEOUT),
            startup_timeout_ms: duration_ms(timeouts::BACKEND_STARTUP_TIMEOUT),
            poll_interval_ms: duration_ms(timeouts::BACKEND_POLL_INTERVAL),
            username: "admin".to_string(),
            password: "password".to_string(),
        }
    }
}

/// Fully resolved harness settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessSettings {
    /// Server-under-test settings.
    pub server: ServerSettings,
    /// Mock backend settings.
    pub backend: BackendSettings,
    /// Log level used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Timeout floor applied to deadlines.
    #[serde(skip)]
    pub timeout_floor: Option<Duration>,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            backend: BackendSettings::default(),
            log_level: "info".to_string(),
            timeout_floor: None,
        }
    }
}

impl HarnessSettings {
    /// Loads settings from an optional TOML file and the environment.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when the file cannot be read or parsed, an
    /// environment override is invalid, or the result fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let overrides = EnvOverrides::load().map_err(SettingsError::Env)?;
        settings.apply_env(&overrides);
        settings.validate()?;
        Ok(settings)
    }

    /// Parses settings from a TOML file without applying env overrides.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Read`] or [`SettingsError::Parse`].
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|err| SettingsError::Read {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Self::from_toml_str(&content).map_err(|message| SettingsError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parses settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns the parser message when the text is not valid settings TOML.
    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|err| err.to_string())
    }

    /// Applies environment overrides on top of the current values.
    pub fn apply_env(&mut self, overrides: &EnvOverrides) {
        if let Some(binary) = &overrides.server_binary {
            self.server.binary.clone_from(binary);
        }
        if let Some(dir) = &overrides.mock_dir {
            self.backend.workdir.clone_from(dir);
        }
        if let Some(url) = &overrides.backend_url {
            self.backend.base_url = url.trim_end_matches('/').to_string();
        }
        if overrides.skip_backend {
            self.backend.managed = false;
        }
        if let Some(level) = &overrides.log_level {
            self.log_level.clone_from(level);
        }
        if overrides.timeout.is_some() {
            self.timeout_floor = overrides.timeout;
        }
    }

    /// Validates structural invariants.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] when a required value is empty.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.server.binary.as_os_str().is_empty() {
            return Err(SettingsError::Invalid("server.binary must not be empty".to_string()));
        }
        if self.backend.base_url.trim().is_empty() {
            return Err(SettingsError::Invalid("backend.base_url must not be empty".to_string()));
        }
        if !self.backend.health_path.starts_with('/') {
            return Err(SettingsError::Invalid(
                "backend.health_path must start with '/'".to_string(),
            ));
        }
        if self.backend.managed
            && (self.backend.up_command.is_empty() || self.backend.down_command.is_empty())
        {
            return Err(SettingsError::Invalid(
                "backend up_command and down_command must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the server settle delay.
    #[must_use]
    pub const fn server_settle_delay(&self) -> Duration {
        timeouts::millis(self.server.settle_delay_ms)
    }

    /// Returns the server stop grace period.
    #[must_use]
    pub const fn server_stop_grace(&self) -> Duration {
        timeouts::millis(self.server.stop_grace_ms)
    }

    /// Returns the per-response deadline with the timeout floor applied.
    #[must_use]
    pub fn response_timeout(&self) -> Duration {
        timeouts::resolve_timeout(
            timeouts::millis(self.server.response_timeout_ms),
            self.timeout_floor,
        )
    }

    /// Returns the backend settle delay.
    #[must_use]
    pub const fn backend_settle_delay(&self) -> Duration {
        timeouts::millis(self.backend.settle_delay_ms)
    }

    /// Returns the per-probe timeout.
    #[must_use]
    pub const fn backend_probe_timeout(&self) -> Duration {
        timeouts::millis(self.backend.probe_timeout_ms)
    }

    /// Returns the startup budget with the timeout floor applied.
    #[must_use]
    pub fn backend_startup_timeout(&self) -> Duration {
        timeouts::resolve_timeout(
            timeouts::millis(self.backend.startup_timeout_ms),
            self.timeout_floor,
        )
    }

    /// Returns the startup poll interval.
    #[must_use]
    pub const fn backend_poll_interval(&self) -> Duration {
        timeouts::millis(self.backend.poll_interval_ms)
    }
}

/// Converts a duration into whole milliseconds, saturating at `u64::MAX`.
fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
