// crates/studio-mcp-harness/src/checks.rs
// ============================================================================
// Module: Scenario Checks
// Description: Individual checks against the mock backend and the MCP server.
// Purpose: Decide pass/fail for each scenario in the integration catalog.
// Dependencies: serde_json, tracing
// ============================================================================

//! ## Overview
//! Checks return `Ok(false)` for anything the stack answered wrongly,
//! including protocol errors and transport failures, and log the reason.
//! `Err` is reserved for a check that could not run at all.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use serde_json::json;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncWrite;
use tracing::info;
use tracing::warn;

use crate::backend::BackendProbe;
use crate::jsonrpc::JsonRpcResponse;
use crate::mcp::ClientInfo;
use crate::mcp::payload_succeeded;
use crate::mcp::result_items;
use crate::mcp::tool_names;
use crate::mcp::tool_payload;
use crate::scenario::CheckError;
use crate::transport::StdioTransport;
use crate::transport::TransportError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Tools the server must advertise.
pub const REQUIRED_TOOLS: [&str; 3] = ["plm_list_pipelines", "plm_resolve_run_id", "plm_get_run_log"];
/// Pipeline seeded in the mock backend fixtures.
pub const FIXTURE_PIPELINE: &str = "build-api-service";
/// Run number seeded for [`FIXTURE_PIPELINE`].
pub const FIXTURE_RUN_NUMBER: u64 = 1;
/// Client name announced by the integration suite.
const CLIENT_NAME: &str = "integration-test";
/// Client version announced by the integration suite.
const CLIENT_VERSION: &str = "1.0.0";

// ============================================================================
// SECTION: Backend Checks
// ============================================================================

/// Passes when the backend health endpoint reports healthy.
///
/// # Errors
///
/// Never returns an error; the signature matches the other checks.
pub async fn backend_health(probe: &BackendProbe) -> Result<bool, CheckError> {
    Ok(probe.health_check().await)
}

/// Passes when the token endpoint issues an access token.
///
/// # Errors
///
/// Never returns an error; backend failures are reported as `Ok(false)`.
pub async fn backend_auth(
    probe: &BackendProbe,
    username: &str,
    password: &str,
) -> Result<bool, CheckError> {
    match probe.issue_token(username, password).await {
        Ok(_) => Ok(true),
        Err(err) => {
            warn!(error = %err, "token request failed");
            Ok(false)
        }
    }
}

/// Passes when the pipeline listing endpoint returns a non-empty array.
///
/// # Errors
///
/// Never returns an error; backend failures are reported as `Ok(false)`.
pub async fn backend_pipelines(probe: &BackendProbe) -> Result<bool, CheckError> {
    match probe.list_pipelines().await {
        Ok(pipelines) => {
            info!(count = pipelines.len(), "backend pipelines listed");
            Ok(!pipelines.is_empty())
        }
        Err(err) => {
            warn!(error = %err, "pipeline listing failed");
            Ok(false)
        }
    }
}

// ============================================================================
// SECTION: Handshake Checks
// ============================================================================

/// Passes when `initialize` returns a result carrying a `serverInfo` object.
///
/// # Errors
///
/// Never returns an error; failures are reported as `Ok(false)`.
pub async fn server_initialization<W, R>(
    transport: &mut StdioTransport<W, R>,
) -> Result<bool, CheckError>
where
    W: AsyncWrite + Unpin,
    R: AsyncBufRead + Unpin,
{
    let client = ClientInfo::new(CLIENT_NAME, CLIENT_VERSION);
    let outcome = transport.initialize(&client, json!({})).await;
    let Some(result) = expect_result("initialize", outcome) else {
        return Ok(false);
    };
    Ok(result.get("serverInfo").is_some_and(Value::is_object))
}

/// Passes when `tools/list` advertises every tool in [`REQUIRED_TOOLS`].
///
/// # Errors
///
/// Never returns an error; failures are reported as `Ok(false)`.
pub async fn tools_list<W, R>(transport: &mut StdioTransport<W, R>) -> Result<bool, CheckError>
where
    W: AsyncWrite + Unpin,
    R: AsyncBufRead + Unpin,
{
    let Some(result) = expect_result("tools/list", transport.list_tools().await) else {
        return Ok(false);
    };
    let names = tool_names(&result);
    info!(count = names.len(), "tools listed");
    let missing: Vec<&str> =
        REQUIRED_TOOLS.iter().copied().filter(|tool| !names.contains(tool)).collect();
    if !missing.is_empty() {
        warn!(?missing, "required tools are not advertised");
        return Ok(false);
    }
    Ok(!names.is_empty())
}

/// Passes when `resources/list` returns at least one resource.
///
/// # Errors
///
/// Never returns an error; failures are reported as `Ok(false)`.
pub async fn resources_list<W, R>(transport: &mut StdioTransport<W, R>) -> Result<bool, CheckError>
where
    W: AsyncWrite + Unpin,
    R: AsyncBufRead + Unpin,
{
    let Some(result) = expect_result("resources/list", transport.list_resources().await) else {
        return Ok(false);
    };
    let count = result_items(&result, "resources").len();
    info!(count, "resources listed");
    Ok(count > 0)
}

// ============================================================================
// SECTION: Tool Checks
// ============================================================================

/// Passes when `plm_list_pipelines` succeeds with non-empty `data`.
///
/// # Errors
///
/// Never returns an error; failures are reported as `Ok(false)`.
pub async fn plm_list_pipelines<W, R>(
    transport: &mut StdioTransport<W, R>,
) -> Result<bool, CheckError>
where
    W: AsyncWrite + Unpin,
    R: AsyncBufRead + Unpin,
{
    let name = "plm_list_pipelines";
    let Some(payload) = successful_payload(name, transport.call_tool(name, json!({})).await) else {
        return Ok(false);
    };
    let count = result_items(&payload, "data").len();
    info!(count, "pipelines returned by tool");
    Ok(count > 0)
}

/// Passes when `plm_resolve_run_id` resolves the fixture run to an id.
///
/// # Errors
///
/// Never returns an error; failures are reported as `Ok(false)`.
pub async fn plm_resolve_run_id<W, R>(
    transport: &mut StdioTransport<W, R>,
) -> Result<bool, CheckError>
where
    W: AsyncWrite + Unpin,
    R: AsyncBufRead + Unpin,
{
    let name = "plm_resolve_run_id";
    let arguments = json!({
        "pipeline_name": FIXTURE_PIPELINE,
        "run_number": FIXTURE_RUN_NUMBER,
    });
    let Some(payload) = successful_payload(name, transport.call_tool(name, arguments).await) else {
        return Ok(false);
    };
    let run_id = payload.get("run_id").filter(|value| !value.is_null());
    info!(run_id = ?run_id, "run id resolved");
    Ok(run_id.is_some())
}

/// Passes when `plm_get_run_log` succeeds for the fixture run by name.
///
/// # Errors
///
/// Never returns an error; failures are reported as `Ok(false)`.
pub async fn plm_get_run_logs_with_name<W, R>(
    transport: &mut StdioTransport<W, R>,
) -> Result<bool, CheckError>
where
    W: AsyncWrite + Unpin,
    R: AsyncBufRead + Unpin,
{
    let name = "plm_get_run_log";
    let arguments = json!({
        "pipeline_name": FIXTURE_PIPELINE,
        "run_number": FIXTURE_RUN_NUMBER,
        "errors_only": true,
    });
    let Some(payload) = successful_payload(name, transport.call_tool(name, arguments).await) else {
        return Ok(false);
    };
    info!(count = result_items(&payload, "logs").len(), "log entries retrieved");
    Ok(true)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the result value, logging transport failures and protocol errors.
fn expect_result(method: &str, outcome: Result<JsonRpcResponse, TransportError>) -> Option<Value> {
    match outcome {
        Ok(response) => match response.into_result() {
            Ok(result) => Some(result),
            Err(error) => {
                warn!(method, error = %error, "server returned a protocol error");
                None
            }
        },
        Err(err) => {
            warn!(method, error = %err, "transport failure");
            None
        }
    }
}

/// Returns the tool payload when the call succeeded and reports success.
fn successful_payload(
    tool: &str,
    outcome: Result<JsonRpcResponse, TransportError>,
) -> Option<Value> {
    let result = expect_result("tools/call", outcome)?;
    let payload = match tool_payload(&result) {
        Ok(payload) => payload,
        Err(reason) => {
            warn!(tool, %reason, "tool result could not be decoded");
            return None;
        }
    };
    if payload_succeeded(&payload) {
        Some(payload)
    } else {
        warn!(tool, payload = %payload, "tool reported failure");
        None
    }
}
