// crates/studio-mcp-harness/src/mcp.rs
// ============================================================================
// Module: MCP Calls
// Description: Typed MCP method calls layered on the stdio transport.
// Purpose: Keep protocol shapes out of scenario checks and the smoke runner.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Each call returns the raw [`JsonRpcResponse`] so callers can tell protocol
//! errors from results. Tool results embed their payload as JSON text in the
//! first content item; [`tool_payload`] decodes it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use serde_json::json;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncWrite;

use crate::jsonrpc::JsonRpcResponse;
use crate::transport::StdioTransport;
use crate::transport::TransportError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// MCP protocol revision announced during initialization.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Notification sent once initialization succeeds.
const INITIALIZED_NOTIFICATION: &str = "notifications/initialized";

// ============================================================================
// SECTION: Client Identity
// ============================================================================

/// Client identity announced in `initialize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    pub version: String,
}

impl ClientInfo {
    /// Builds a client identity.
    #[must_use]
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Typed Calls
// ============================================================================

impl<W, R> StdioTransport<W, R>
where
    W: AsyncWrite + Unpin,
    R: AsyncBufRead + Unpin,
{
    /// Performs the `initialize` handshake.
    ///
    /// When the server answers with a result, `notifications/initialized` is
    /// sent before returning.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the exchange or the follow-up
    /// notification fails below the protocol layer.
    pub async fn initialize(
        &mut self,
        client: &ClientInfo,
        capabilities: Value,
    ) -> Result<JsonRpcResponse, TransportError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": capabilities,
            "clientInfo": {
                "name": client.name,
                "version": client.version,
            },
        });
        let response = self.send("initialize", Some(params)).await?;
        if response.result().is_some() {
            self.notify(INITIALIZED_NOTIFICATION, None).await?;
        }
        Ok(response)
    }

    /// Calls `tools/list` without params.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on transport failure.
    pub async fn list_tools(&mut self) -> Result<JsonRpcResponse, TransportError> {
        self.send("tools/list", None).await
    }

    /// Calls `resources/list` without params.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on transport failure.
    pub async fn list_resources(&mut self) -> Result<JsonRpcResponse, TransportError> {
        self.send("resources/list", None).await
    }

    /// Calls `resources/read` for `uri`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on transport failure.
    pub async fn read_resource(&mut self, uri: &str) -> Result<JsonRpcResponse, TransportError> {
        self.send("resources/read", Some(json!({"uri": uri}))).await
    }

    /// Calls `tools/call` for `name` with `arguments`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on transport failure.
    pub async fn call_tool(
        &mut self,
        name: &str,
        arguments: Value,
    ) -> Result<JsonRpcResponse, TransportError> {
        self.send("tools/call", Some(json!({"name": name, "arguments": arguments}))).await
    }
}

// ============================================================================
// SECTION: Result Accessors
// ============================================================================

/// Returns the names listed in a `tools/list` result.
#[must_use]
pub fn tool_names(result: &Value) -> Vec<&str> {
    result_items(result, "tools")
        .iter()
        .filter_map(|tool| tool.get("name").and_then(Value::as_str))
        .collect()
}

/// Returns the array stored under `key` in a list result, or an empty slice.
#[must_use]
pub fn result_items<'a>(result: &'a Value, key: &str) -> &'a [Value] {
    result.get(key).and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default()
}

/// Decodes the JSON payload embedded in a `tools/call` result.
///
/// # Errors
///
/// Returns a short reason when the result has no content items or the first
/// item's text is not JSON.
pub fn tool_payload(result: &Value) -> Result<Value, String> {
    let first = result_items(result, "content")
        .first()
        .ok_or_else(|| "tool result has no content".to_string())?;
    let text = first.get("text").and_then(Value::as_str).unwrap_or("{}");
    serde_json::from_str(text).map_err(|err| format!("tool payload is not json: {err}"))
}

/// Returns true when a tool payload reports `success: true`.
#[must_use]
pub fn payload_succeeded(payload: &Value) -> bool {
    payload.get("success").and_then(Value::as_bool).unwrap_or(false)
}
