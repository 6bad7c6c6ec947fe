// crates/studio-mcp-harness/src/config/env.rs
// ============================================================================
// Module: Harness Environment
// Description: Environment-backed overrides for harness settings.
// Purpose: Centralize env parsing with strict UTF-8 validation.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Environment values are parsed with strict UTF-8 enforcement to avoid silent
//! misconfiguration. Invalid UTF-8, empty values, and malformed numbers fail
//! closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// SECTION: Environment Constants
// ============================================================================

/// Environment keys for harness configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessEnv {
    /// Path to the server-under-test executable.
    ServerBinary,
    /// Working directory holding the mock backend compose project.
    MockDir,
    /// Base URL of the mock backend.
    BackendUrl,
    /// Timeout floor in seconds (positive integer).
    TimeoutSeconds,
    /// Skip mock backend lifecycle management (`true`/`false` or `1`/`0`).
    SkipBackend,
    /// Log level used when `RUST_LOG` is unset.
    LogLevel,
}

impl HarnessEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ServerBinary => "STUDIO_MCP_HARNESS_SERVER_BIN",
            Self::MockDir => "STUDIO_MCP_HARNESS_MOCK_DIR",
            Self::BackendUrl => "STUDIO_MCP_HARNESS_BACKEND_URL",
            Self::TimeoutSeconds => "STUDIO_MCP_HARNESS_TIMEOUT_SEC",
            Self::SkipBackend => "STUDIO_MCP_HARNESS_SKIP_BACKEND",
            Self::LogLevel => "STUDIO_MCP_HARNESS_LOG_LEVEL",
        }
    }
}

// ============================================================================
// SECTION: Override Types
// ============================================================================

/// Typed overrides derived from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvOverrides {
    /// Optional server binary override.
    pub server_binary: Option<PathBuf>,
    /// Optional mock backend directory override.
    pub mock_dir: Option<PathBuf>,
    /// Optional backend base URL override.
    pub backend_url: Option<String>,
    /// Optional timeout floor (positive integer seconds).
    pub timeout: Option<Duration>,
    /// Skip mock backend lifecycle management.
    pub skip_backend: bool,
    /// Optional log level override.
    pub log_level: Option<String>,
}

impl EnvOverrides {
    /// Loads overrides from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error when an environment value is not valid UTF-8, is empty,
    /// or fails validation (for example, an invalid timeout or boolean value).
    pub fn load() -> Result<Self, String> {
        let server_binary =
            read_env_nonempty(HarnessEnv::ServerBinary.as_str())?.map(PathBuf::from);
        let mock_dir = read_env_nonempty(HarnessEnv::MockDir.as_str())?.map(PathBuf::from);
        let backend_url = read_env_nonempty(HarnessEnv::BackendUrl.as_str())?;
        let timeout = read_env_nonempty(HarnessEnv::TimeoutSeconds.as_str())?
            .map(|value| parse_timeout_seconds(HarnessEnv::TimeoutSeconds.as_str(), &value))
            .transpose()?;
        let skip_backend = parse_bool_env(
            HarnessEnv::SkipBackend.as_str(),
            read_env_nonempty(HarnessEnv::SkipBackend.as_str())?,
        )?;
        let log_level = read_env_nonempty(HarnessEnv::LogLevel.as_str())?;
        Ok(Self {
            server_binary,
            mock_dir,
            backend_url,
            timeout,
            skip_backend,
            log_level,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads an environment variable and enforces UTF-8 validity.
///
/// # Errors
///
/// Returns an error when the environment variable contains invalid UTF-8.
pub fn read_env_strict(name: &str) -> Result<Option<String>, String> {
    std::env::var_os(name).map_or(Ok(None), |raw| {
        raw.into_string().map(Some).map_err(|_| format!("{name} must be valid UTF-8"))
    })
}

/// Reads an environment variable and rejects empty values.
fn read_env_nonempty(name: &str) -> Result<Option<String>, String> {
    match read_env_strict(name)? {
        Some(value) if value.trim().is_empty() => Err(format!("{name} must not be empty")),
        Some(value) => Ok(Some(value)),
        None => Ok(None),
    }
}

/// Parses a positive timeout value from an environment variable string.
pub(crate) fn parse_timeout_seconds(name: &str, raw: &str) -> Result<Duration, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(format!("{name} must be a positive integer number of seconds"));
    }
    let secs: u64 = trimmed
        .parse()
        .map_err(|_| format!("{name} must be a positive integer number of seconds"))?;
    if secs == 0 {
        return Err(format!("{name} must be greater than zero"));
    }
    Ok(Duration::from_secs(secs))
}

/// Parses a boolean environment variable; unset means `false`.
fn parse_bool_env(name: &str, raw: Option<String>) -> Result<bool, String> {
    let Some(value) = raw else {
        return Ok(false);
    };
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("true") || trimmed == "1" {
        return Ok(true);
    }
    if trimmed.eq_ignore_ascii_case("false") || trimmed == "0" {
        return Ok(false);
    }
    Err(format!("{name} must be 1, 0, true, or false"))
}
