// crates/studio-mcp-harness/src/backend.rs
// ============================================================================
// Module: Mock Backend Lifecycle
// Description: Compose-managed mock backend and its HTTP probe.
// Purpose: Bring the backend up, gate on health, and always tear it down.
// Dependencies: async-trait, reqwest, tokio, tracing
// ============================================================================

//! ## Overview
//! [`MockBackend`] runs an out-of-process orchestration command in the mock
//! backend's directory, waits a settle interval, then polls the health
//! endpoint until it reports healthy or the startup budget expires.
//! [`BackendProbe`] performs the bounded HTTP probes used both for that gate
//! and for the backend scenarios.
//!
//! Invariants:
//! - `health_check` never errors; every failure reads as "unhealthy".
//! - `stop` swallows tear-down failures and only logs them.
//! - Once the bring-up command has been launched, tear-down runs on `stop` or,
//!   failing that, when the manager is dropped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::HarnessSettings;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Body value the health endpoint reports when healthy.
const HEALTHY_STATUS: &str = "healthy";
/// Token-issuing endpoint path.
const TOKEN_PATH: &str = "/api/auth/token";
/// Pipeline listing endpoint path.
const PIPELINES_PATH: &str = "/api/plm/pipelines";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Mock backend errors.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The HTTP client could not be built.
    #[error("backend http client unavailable: {0}")]
    Client(String),
    /// A request failed before a response arrived.
    #[error("backend request to {endpoint} failed: {message}")]
    Request {
        /// Endpoint path.
        endpoint: String,
        /// Transport error message.
        message: String,
    },
    /// The backend answered with an unexpected status.
    #[error("backend {endpoint} returned status {status}")]
    Status {
        /// Endpoint path.
        endpoint: String,
        /// HTTP status code.
        status: u16,
    },
    /// The response body did not have the expected shape.
    #[error("backend {endpoint} returned an unexpected body: {message}")]
    Body {
        /// Endpoint path.
        endpoint: String,
        /// Shape diagnostic.
        message: String,
    },
    /// An orchestration command failed.
    #[error("command `{command}` failed: {message}")]
    Command {
        /// Command line as configured.
        command: String,
        /// Spawn error or exit diagnostic.
        message: String,
    },
    /// The backend never reported healthy within the startup budget.
    #[error("backend not healthy after {attempts} probes over {}ms", .waited.as_millis())]
    Unhealthy {
        /// Number of health probes issued.
        attempts: u32,
        /// Time spent polling.
        waited: Duration,
    },
}

// ============================================================================
// SECTION: Probe
// ============================================================================

/// Bounded HTTP probes against the mock backend.
///
/// # Invariants
/// - Base URL is normalized without a trailing slash.
#[derive(Debug, Clone)]
pub struct BackendProbe {
    /// Backend base URL (no trailing slash).
    base_url: String,
    /// Health endpoint path.
    health_path: String,
    /// HTTP client configured with the probe timeout.
    client: Client,
}

impl BackendProbe {
    /// Builds a probe for `base_url` with a per-request `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Client`] when the HTTP client cannot be built.
    pub fn new(base_url: &str, health_path: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|err| BackendError::Client(err.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            health_path: health_path.to_string(),
            client,
        })
    }

    /// Builds a probe from resolved harness settings.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Client`] when the HTTP client cannot be built.
    pub fn from_settings(settings: &HarnessSettings) -> Result<Self, BackendError> {
        Self::new(
            &settings.backend.base_url,
            &settings.backend.health_path,
            settings.backend_probe_timeout(),
        )
    }

    /// Returns the normalized base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Probes the health endpoint once.
    ///
    /// Healthy means HTTP 200 and a JSON body whose `status` is `healthy`.
    pub async fn health_check(&self) -> bool {
        match self.get_json(&self.health_path).await {
            Ok(body) => body.get("status").and_then(Value::as_str) == Some(HEALTHY_STATUS),
            Err(err) => {
                debug!(error = %err, "health probe failed");
                false
            }
        }
    }

    /// Requests an access token for `username`/`password`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the request fails, the status is not
    /// 200, or the body carries no `access_token`.
    pub async fn issue_token(&self, username: &str, password: &str) -> Result<Value, BackendError> {
        let response = self
            .client
            .post(self.url(TOKEN_PATH))
            .json(&json!({"username": username, "password": password}))
            .send()
            .await
            .map_err(|err| request_error(TOKEN_PATH, &err))?;
        let body = read_json(TOKEN_PATH, response).await?;
        body.get("access_token").cloned().ok_or_else(|| BackendError::Body {
            endpoint: TOKEN_PATH.to_string(),
            message: "missing access_token".to_string(),
        })
    }

    /// Lists pipelines known to the backend.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the request fails, the status is not
    /// 200, or the body is not a JSON array.
    pub async fn list_pipelines(&self) -> Result<Vec<Value>, BackendError> {
        match self.get_json(PIPELINES_PATH).await? {
            Value::Array(items) => Ok(items),
            other => Err(BackendError::Body {
                endpoint: PIPELINES_PATH.to_string(),
                message: format!("expected an array, got {other}"),
            }),
        }
    }

    /// Issues a GET against `path` and decodes the 200 body.
    async fn get_json(&self, path: &str) -> Result<Value, BackendError> {
        let response =
            self.client.get(self.url(path)).send().await.map_err(|err| request_error(path, &err))?;
        read_json(path, response).await
    }

    /// Joins `path` onto the base URL.
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Requires a 200 status and decodes the JSON body.
async fn read_json(endpoint: &str, response: reqwest::Response) -> Result<Value, BackendError> {
    if response.status() != StatusCode::OK {
        return Err(BackendError::Status {
            endpoint: endpoint.to_string(),
            status: response.status().as_u16(),
        });
    }
    response.json::<Value>().await.map_err(|err| BackendError::Body {
        endpoint: endpoint.to_string(),
        message: err.to_string(),
    })
}

/// Maps a client failure for `endpoint`.
fn request_error(endpoint: &str, err: &reqwest::Error) -> BackendError {
    BackendError::Request {
        endpoint: endpoint.to_string(),
        message: err.to_string(),
    }
}

// ============================================================================
// SECTION: Lifecycle Interface
// ============================================================================

/// External service whose lifecycle the suite owns.
#[async_trait]
pub trait ManagedService: Send + Sync {
    /// Brings the service up and waits until it is healthy.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when bring-up fails or health never arrives.
    async fn start(&mut self) -> Result<(), BackendError>;

    /// Tears the service down; failures are logged, never returned.
    async fn stop(&mut self);

    /// Probes health once; failures read as unhealthy.
    async fn health_check(&self) -> bool;
}

// ============================================================================
// SECTION: Compose Backend
// ============================================================================

/// Timing for health-gated startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupTiming {
    /// Wait after the bring-up command before the first probe.
    pub settle_delay: Duration,
    /// Total polling budget.
    pub startup_timeout: Duration,
    /// Wait between probes.
    pub poll_interval: Duration,
}

/// Whether tear-down is owed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServiceState {
    /// Nothing launched.
    Idle,
    /// The bring-up command was launched; tear-down is owed.
    Launched,
}

/// Mock backend managed through orchestration commands.
#[derive(Debug)]
pub struct MockBackend {
    /// Working directory for the orchestration commands.
    workdir: PathBuf,
    /// Bring-up command and arguments.
    up_command: Vec<String>,
    /// Tear-down command and arguments.
    down_command: Vec<String>,
    /// Startup gating.
    timing: StartupTiming,
    /// HTTP probe for the health endpoint.
    probe: BackendProbe,
    /// Whether tear-down is owed.
    state: ServiceState,
}

impl MockBackend {
    /// Builds a backend manager.
    #[must_use]
    pub const fn new(
        workdir: PathBuf,
        up_command: Vec<String>,
        down_command: Vec<String>,
        timing: StartupTiming,
        probe: BackendProbe,
    ) -> Self {
        Self {
            workdir,
            up_command,
            down_command,
            timing,
            probe,
            state: ServiceState::Idle,
        }
    }

    /// Builds a backend manager from resolved harness settings.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Client`] when the probe cannot be built.
    pub fn from_settings(settings: &HarnessSettings) -> Result<Self, BackendError> {
        Ok(Self::new(
            settings.backend.workdir.clone(),
            settings.backend.up_command.clone(),
            settings.backend.down_command.clone(),
            StartupTiming {
                settle_delay: settings.backend_settle_delay(),
                startup_timeout: settings.backend_startup_timeout(),
                poll_interval: settings.backend_poll_interval(),
            },
            BackendProbe::from_settings(settings)?,
        ))
    }

    /// Returns the probe bound to this backend.
    #[must_use]
    pub const fn probe(&self) -> &BackendProbe {
        &self.probe
    }

    /// Polls health until it passes or the startup budget is spent.
    async fn wait_for_healthy(&self) -> Result<(), BackendError> {
        let start = Instant::now();
        let mut attempts = 0u32;
        loop {
            attempts = attempts.saturating_add(1);
            if self.probe.health_check().await {
                info!(attempts, "mock backend healthy");
                return Ok(());
            }
            if start.elapsed() >= self.timing.startup_timeout {
                return Err(BackendError::Unhealthy {
                    attempts,
                    waited: start.elapsed(),
                });
            }
            tokio::time::sleep(self.timing.poll_interval).await;
        }
    }
}

#[async_trait]
impl ManagedService for MockBackend {
    async fn start(&mut self) -> Result<(), BackendError> {
        if self.state == ServiceState::Launched {
            return self.wait_for_healthy().await;
        }
        info!(workdir = %self.workdir.display(), "starting mock backend");
        self.state = ServiceState::Launched;
        run_command(&self.up_command, &self.workdir).await?;
        tokio::time::sleep(self.timing.settle_delay).await;
        self.wait_for_healthy().await
    }

    async fn stop(&mut self) {
        if self.state == ServiceState::Idle {
            return;
        }
        self.state = ServiceState::Idle;
        match run_command(&self.down_command, &self.workdir).await {
            Ok(()) => info!("mock backend stopped"),
            Err(err) => warn!(error = %err, "mock backend tear-down failed"),
        }
    }

    async fn health_check(&self) -> bool {
        self.probe.health_check().await
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        if self.state == ServiceState::Idle {
            return;
        }
        // Last resort: only reached when `stop` was skipped. Blocks the
        // dropping thread until the down command exits.
        let Some((program, args)) = self.down_command.split_first() else {
            return;
        };
        warn!(
            workdir = %self.workdir.display(),
            "mock backend dropped without stop; running tear-down synchronously"
        );
        let result = std::process::Command::new(program)
            .args(args)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if let Err(err) = result {
            warn!(error = %err, "mock backend tear-down on drop failed");
        }
    }
}

/// Runs one orchestration command in `workdir`, capturing its output.
async fn run_command(command: &[String], workdir: &Path) -> Result<(), BackendError> {
    let rendered = command.join(" ");
    let Some((program, args)) = command.split_first() else {
        return Err(BackendError::Command {
            command: rendered,
            message: "command is empty".to_string(),
        });
    };
    debug!(command = %rendered, "running orchestration command");
    let output = Command::new(program)
        .args(args)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|err| BackendError::Command {
            command: rendered.clone(),
            message: err.to_string(),
        })?;
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(BackendError::Command {
        command: rendered,
        message: format!("{} {}", output.status, stderr.trim()),
    })
}
