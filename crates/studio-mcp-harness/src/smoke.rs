// crates/studio-mcp-harness/src/smoke.rs
// ============================================================================
// Module: Smoke Runner
// Description: Five-step sanity check against the server without a backend.
// Purpose: Fast manual verification of the protocol surface.
// Dependencies: serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! Steps run in a fixed order: initialize, list resources, list tools, read
//! one resource, call one tool. Only start and initialize failures end the
//! run early; every other step records pass/fail and the run continues. The
//! server is stopped on every path.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use tracing::info;
use tracing::warn;

use crate::jsonrpc::JsonRpcResponse;
use crate::mcp::ClientInfo;
use crate::mcp::result_items;
use crate::process::ProcessError;
use crate::process::ProcessOptions;
use crate::process::ServerProcess;
use crate::process::ServerTransport;
use crate::transport::TransportError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Resource read by default.
pub const DEFAULT_RESOURCE_URI: &str = "studio://plm/";
/// Tool called by default.
pub const DEFAULT_TOOL: &str = "plm_list_pipelines";
/// Listing entries shown per step.
const PREVIEW_LIMIT: usize = 5;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Errors that end the smoke run early.
#[derive(Debug, Error)]
pub enum SmokeError {
    /// The server could not be started.
    #[error("failed to start server: {0}")]
    Start(#[from] ProcessError),
    /// Initialization failed; no later step is meaningful.
    #[error("initialization failed: {0}")]
    Initialize(String),
}

/// Smoke run options.
#[derive(Debug, Clone, PartialEq)]
pub struct SmokeOptions {
    /// Server executable.
    pub server_binary: PathBuf,
    /// Optional configuration file passed as the server's only argument.
    pub config: Option<PathBuf>,
    /// Resource read in step 4.
    pub resource_uri: String,
    /// Tool called in step 5.
    pub tool: String,
    /// Arguments for the tool call.
    pub tool_arguments: Value,
    /// Process timing.
    pub process: ProcessOptions,
}

impl SmokeOptions {
    /// Builds options with the default resource and tool.
    #[must_use]
    pub fn new(server_binary: PathBuf) -> Self {
        Self {
            server_binary,
            config: None,
            resource_uri: DEFAULT_RESOURCE_URI.to_string(),
            tool: DEFAULT_TOOL.to_string(),
            tool_arguments: json!({"limit": 1}),
            process: ProcessOptions::default(),
        }
    }
}

/// Outcome of one smoke step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmokeStep {
    /// 1-based step number.
    pub number: usize,
    /// Step title.
    pub title: String,
    /// Whether the server answered with a result.
    pub passed: bool,
    /// Human-readable detail lines.
    pub details: Vec<String>,
}

/// Completed smoke run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmokeReport {
    /// Steps in run order.
    pub steps: Vec<SmokeStep>,
}

impl SmokeReport {
    /// Returns the number of passing steps.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.steps.iter().filter(|step| step.passed).count()
    }
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Runs the smoke steps, passing each to `observer` as it completes.
///
/// # Errors
///
/// Returns [`SmokeError`] when the server cannot start or initialization
/// fails. The server has been stopped before this returns.
pub async fn run_smoke<F>(options: &SmokeOptions, mut observer: F) -> Result<SmokeReport, SmokeError>
where
    F: FnMut(&SmokeStep),
{
    let mut server = ServerProcess::new(options.process.clone());
    server.start(&options.server_binary, options.config.iter()).await?;
    let outcome = match server.transport_mut() {
        Ok(transport) => run_steps(transport, options, &mut observer).await,
        Err(err) => Err(SmokeError::Initialize(err.to_string())),
    };
    server.stop().await;
    outcome
}

/// Runs the five steps over a started server.
async fn run_steps<F>(
    transport: &mut ServerTransport,
    options: &SmokeOptions,
    observer: &mut F,
) -> Result<SmokeReport, SmokeError>
where
    F: FnMut(&SmokeStep),
{
    let mut report = SmokeReport::default();

    let client = ClientInfo::new("test-client", "1.0.0");
    let capabilities = json!({"roots": {"listChanged": true}, "sampling": {}});
    let init = transport.initialize(&client, capabilities).await;
    let result = match response_result(init) {
        Ok(result) => result,
        Err(reason) => {
            let failed = step(1, "MCP initialization", false, vec![reason.clone()]);
            warn!(step = 1, %reason, "smoke initialization failed");
            observer(&failed);
            return Err(SmokeError::Initialize(reason));
        }
    };
    let server_info = result.get("serverInfo");
    let field = |key: &str| {
        server_info.and_then(|info| info.get(key)).and_then(Value::as_str).unwrap_or("unknown").to_string()
    };
    record(
        &mut report,
        observer,
        step(
            1,
            "MCP initialization",
            true,
            vec![format!("Server: {}", field("name")), format!("Version: {}", field("version"))],
        ),
    );

    // Smoke listings send an explicit empty params object.
    let resources = response_result(transport.send("resources/list", Some(json!({}))).await);
    record(&mut report, observer, listing_step(2, "resource listing", "resources", "uri", resources));

    let tools = response_result(transport.send("tools/list", Some(json!({}))).await);
    record(&mut report, observer, listing_step(3, "tool listing", "tools", "description", tools));

    let read = response_result(transport.read_resource(&options.resource_uri).await);
    record(&mut report, observer, content_step(4, "resource reading", "contents", read));

    let call =
        response_result(transport.call_tool(&options.tool, options.tool_arguments.clone()).await);
    record(&mut report, observer, content_step(5, "tool calling", "content", call));

    info!(passed = report.passed(), total = report.steps.len(), "smoke run finished");
    Ok(report)
}

/// Logs, reports, and stores one step.
fn record<F>(report: &mut SmokeReport, observer: &mut F, step: SmokeStep)
where
    F: FnMut(&SmokeStep),
{
    if !step.passed {
        warn!(step = step.number, title = %step.title, "smoke step failed");
    }
    observer(&step);
    report.steps.push(step);
}

/// Builds a step.
fn step(number: usize, title: &str, passed: bool, details: Vec<String>) -> SmokeStep {
    SmokeStep {
        number,
        title: title.to_string(),
        passed,
        details,
    }
}

/// Builds a listing step that previews names and one secondary field.
fn listing_step(
    number: usize,
    title: &str,
    key: &str,
    secondary: &str,
    outcome: Result<Value, String>,
) -> SmokeStep {
    let result = match outcome {
        Ok(result) => result,
        Err(reason) => return step(number, title, false, vec![reason]),
    };
    let items = result_items(&result, key);
    let mut details = vec![format!("Found {} {key}", items.len())];
    details.extend(items.iter().take(PREVIEW_LIMIT).map(|item| {
        let name = item.get("name").and_then(Value::as_str).unwrap_or("unknown");
        let extra = item.get(secondary).and_then(Value::as_str).unwrap_or("-");
        format!("  - {name}: {extra}")
    }));
    if items.len() > PREVIEW_LIMIT {
        details.push(format!("  ... and {} more", items.len() - PREVIEW_LIMIT));
    }
    step(number, title, true, details)
}

/// Builds a step that reports how many content items came back.
fn content_step(number: usize, title: &str, key: &str, outcome: Result<Value, String>) -> SmokeStep {
    match outcome {
        Ok(result) => step(
            number,
            title,
            true,
            vec![format!("Got {} content items", result_items(&result, key).len())],
        ),
        Err(reason) => step(number, title, false, vec![reason]),
    }
}

/// Reduces a call outcome to its result value or a failure reason.
fn response_result(outcome: Result<JsonRpcResponse, TransportError>) -> Result<Value, String> {
    outcome.map_err(|err| err.to_string())?.into_result().map_err(|err| err.to_string())
}
