// crates/studio-mcp-harness/src/suite.rs
// ============================================================================
// Module: Integration Suite
// Description: Setup, ordered scenario catalog, and guaranteed teardown.
// Purpose: Run every scenario against the live stack and report the tally.
// Dependencies: thiserror, tracing
// ============================================================================

//! ## Overview
//! [`IntegrationSuite::run_all`] performs setup, runs the catalog in order
//! when setup succeeds, and tears down exactly once on every path. Setup
//! failures are suite-fatal and no scenario runs. Scenario failures are
//! contained per scenario.
//!
//! Catalog tiers, in run order:
//! - backend health, auth, and data endpoints
//! - protocol handshake and discovery
//! - protocol tool calls that reach the backend through the server
//!
//! Every owned resource also releases itself on drop (child kill, backend
//! tear-down, temp file removal), which covers unwinding out of the suite.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ffi::OsStr;
use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::artifact::ArtifactError;
use crate::artifact::ConfigArtifact;
use crate::artifact::StudioConfig;
use crate::backend::BackendError;
use crate::backend::BackendProbe;
use crate::backend::ManagedService;
use crate::backend::MockBackend;
use crate::checks;
use crate::config::HarnessSettings;
use crate::process::ProcessError;
use crate::process::ProcessOptions;
use crate::process::ServerProcess;
use crate::process::ServerTransport;
use crate::scenario::CheckError;
use crate::scenario::ScenarioResult;
use crate::scenario::SuiteReport;
use crate::scenario::run_scenario;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Suite-fatal setup failures.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The configuration artifact could not be written.
    #[error("failed to write config artifact: {0}")]
    Artifact(#[from] ArtifactError),
    /// The server executable does not exist.
    #[error("MCP server binary not found at {}; build it first (cargo build --release)", .0.display())]
    MissingExecutable(PathBuf),
    /// The mock backend did not come up healthy.
    #[error("failed to start mock backend: {0}")]
    Backend(#[from] BackendError),
    /// The server under test did not start.
    #[error("failed to start MCP server: {0}")]
    Process(#[from] ProcessError),
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Scenario tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Direct probes of the mock backend.
    Backend,
    /// Protocol handshake and discovery.
    Handshake,
    /// Tool calls routed through the server to the backend.
    Tools,
}

/// One entry in the scenario catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// Backend health endpoint reports healthy.
    MockServerHealth,
    /// Backend issues an access token.
    MockServerAuth,
    /// Backend lists at least one pipeline.
    MockServerPipelines,
    /// Server answers `initialize`.
    ServerInitialization,
    /// Server advertises the PLM tools.
    ToolsList,
    /// Server lists at least one resource.
    ResourcesList,
    /// `plm_list_pipelines` returns pipelines.
    PlmListPipelines,
    /// `plm_resolve_run_id` resolves the fixture run.
    PlmResolveRunId,
    /// `plm_get_run_log` returns logs for the fixture run by name.
    PlmGetRunLogsWithName,
}

impl Check {
    /// Catalog in run order.
    pub const ALL: [Self; 9] = [
        Self::MockServerHealth,
        Self::MockServerAuth,
        Self::MockServerPipelines,
        Self::ServerInitialization,
        Self::ToolsList,
        Self::ResourcesList,
        Self::PlmListPipelines,
        Self::PlmResolveRunId,
        Self::PlmGetRunLogsWithName,
    ];

    /// Returns the scenario name used in reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::MockServerHealth => "Mock Server Health",
            Self::MockServerAuth => "Mock Server Auth",
            Self::MockServerPipelines => "Mock Server Pipelines",
            Self::ServerInitialization => "MCP Server Initialization",
            Self::ToolsList => "MCP Tools List",
            Self::ResourcesList => "MCP Resources List",
            Self::PlmListPipelines => "PLM List Pipelines",
            Self::PlmResolveRunId => "PLM Resolve Run ID",
            Self::PlmGetRunLogsWithName => "PLM Get Run Logs with Name",
        }
    }

    /// Returns the tier the scenario belongs to.
    #[must_use]
    pub const fn tier(self) -> Tier {
        match self {
            Self::MockServerHealth | Self::MockServerAuth | Self::MockServerPipelines => {
                Tier::Backend
            }
            Self::ServerInitialization | Self::ToolsList | Self::ResourcesList => Tier::Handshake,
            Self::PlmListPipelines | Self::PlmResolveRunId | Self::PlmGetRunLogsWithName => {
                Tier::Tools
            }
        }
    }
}

// ============================================================================
// SECTION: Suite
// ============================================================================

/// Integration suite over one server process and one backend.
#[derive(Debug)]
pub struct IntegrationSuite<B = MockBackend> {
    /// Resolved settings.
    settings: HarnessSettings,
    /// Probe used by the backend-tier scenarios.
    probe: BackendProbe,
    /// Backend lifecycle.
    backend: B,
    /// Server under test.
    server: ServerProcess,
    /// Configuration artifact written during setup.
    artifact: Option<ConfigArtifact>,
    /// Completed teardowns.
    teardowns: u32,
}

impl IntegrationSuite<MockBackend> {
    /// Builds a suite whose backend is driven by the configured commands.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the HTTP probe cannot be built.
    pub fn from_settings(settings: HarnessSettings) -> Result<Self, BackendError> {
        let backend = MockBackend::from_settings(&settings)?;
        Self::new(settings, backend)
    }
}

impl<B: ManagedService> IntegrationSuite<B> {
    /// Builds a suite around `backend`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the HTTP probe cannot be built.
    pub fn new(settings: HarnessSettings, backend: B) -> Result<Self, BackendError> {
        let probe = BackendProbe::from_settings(&settings)?;
        let server = ServerProcess::new(ProcessOptions::from_settings(&settings));
        Ok(Self {
            settings,
            probe,
            backend,
            server,
            artifact: None,
            teardowns: 0,
        })
    }

    /// Returns how many times teardown has run.
    #[must_use]
    pub const fn teardown_count(&self) -> u32 {
        self.teardowns
    }

    /// Prepares the stack: artifact, executable check, backend, server.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError`] at the first failing step; later steps are
    /// skipped. Whatever was acquired is released by [`Self::teardown`].
    pub async fn setup(&mut self) -> Result<(), SetupError> {
        let config =
            StudioConfig::for_mock_backend(&self.settings.backend.base_url, &self.settings.backend.username);
        let artifact = ConfigArtifact::write(&config)?;
        let artifact_path = artifact.path().to_path_buf();
        self.artifact = Some(artifact);
        debug!(path = %artifact_path.display(), "config artifact written");

        let binary = &self.settings.server.binary;
        if !binary.is_file() {
            return Err(SetupError::MissingExecutable(binary.clone()));
        }

        if self.settings.backend.managed {
            info!("starting mock backend");
            self.backend.start().await?;
        } else {
            info!("mock backend managed externally; skipping bring-up");
        }

        info!(binary = %binary.display(), "starting MCP server");
        let args =
            self.settings.server.args.iter().map(OsStr::new).chain([artifact_path.as_os_str()]);
        self.server.start(binary, args).await?;
        Ok(())
    }

    /// Runs setup, the full catalog, and teardown.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError`] when setup fails; teardown has still run.
    pub async fn run_all(&mut self) -> Result<SuiteReport, SetupError> {
        self.run_all_with(|_| {}).await
    }

    /// Runs the suite, passing each result to `observer` as it completes.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError`] when setup fails; teardown has still run.
    pub async fn run_all_with<F>(&mut self, mut observer: F) -> Result<SuiteReport, SetupError>
    where
        F: FnMut(&ScenarioResult),
    {
        let outcome = match self.setup().await {
            Ok(()) => {
                let mut report = SuiteReport::default();
                for check in Check::ALL {
                    let result = run_scenario(check.name(), self.evaluate(check)).await;
                    if !result.outcome.is_pass() {
                        self.log_last_exchange(check);
                    }
                    observer(&result);
                    report.push(result);
                }
                info!(passed = report.passed(), total = report.total(), "suite finished");
                Ok(report)
            }
            Err(err) => {
                error!(error = %err, "suite setup failed");
                Err(err)
            }
        };
        self.teardown().await;
        outcome
    }

    /// Stops the server, stops the backend, and deletes the artifact.
    ///
    /// Errors are logged, never returned.
    pub async fn teardown(&mut self) {
        self.teardowns = self.teardowns.saturating_add(1);
        info!("tearing down");
        self.server.stop().await;
        if self.settings.backend.managed {
            self.backend.stop().await;
        }
        if let Some(artifact) = self.artifact.take() {
            if let Err(err) = artifact.remove() {
                warn!(error = %err, "config artifact cleanup failed");
            }
        }
    }

    /// Evaluates one catalog entry.
    async fn evaluate(&mut self, check: Check) -> Result<bool, CheckError> {
        let backend = &self.settings.backend;
        match check {
            Check::MockServerHealth => checks::backend_health(&self.probe).await,
            Check::MockServerAuth => {
                checks::backend_auth(&self.probe, &backend.username, &backend.password).await
            }
            Check::MockServerPipelines => checks::backend_pipelines(&self.probe).await,
            Check::ServerInitialization => {
                checks::server_initialization(live_transport(&mut self.server)?).await
            }
            Check::ToolsList => checks::tools_list(live_transport(&mut self.server)?).await,
            Check::ResourcesList => checks::resources_list(live_transport(&mut self.server)?).await,
            Check::PlmListPipelines => {
                checks::plm_list_pipelines(live_transport(&mut self.server)?).await
            }
            Check::PlmResolveRunId => {
                checks::plm_resolve_run_id(live_transport(&mut self.server)?).await
            }
            Check::PlmGetRunLogsWithName => {
                checks::plm_get_run_logs_with_name(live_transport(&mut self.server)?).await
            }
        }
    }

    /// Logs the most recent protocol exchange after a failed server scenario.
    fn log_last_exchange(&mut self, check: Check) {
        if check.tier() == Tier::Backend {
            return;
        }
        let Ok(transport) = self.server.transport_mut() else {
            return;
        };
        if let Some(entry) = transport.transcript().last() {
            debug!(
                scenario = check.name(),
                method = %entry.method,
                request = %entry.request,
                response = ?entry.response,
                error = ?entry.error,
                "last exchange"
            );
        }
    }
}

/// Returns the transport of a live server.
fn live_transport(server: &mut ServerProcess) -> Result<&mut ServerTransport, CheckError> {
    if server.has_exited() {
        return Err(CheckError::Unavailable("server process has exited".to_string()));
    }
    server.transport_mut().map_err(|err| CheckError::Unavailable(err.to_string()))
}
