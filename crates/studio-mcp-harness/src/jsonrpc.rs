// crates/studio-mcp-harness/src/jsonrpc.rs
// ============================================================================
// Module: JSON-RPC Wire Types
// Description: Request, notification, and response shapes for JSON-RPC 2.0.
// Purpose: Encode outbound messages and classify inbound lines.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Inbound lines are classified into responses and server-initiated
//! notifications. A response must carry exactly one of `result` or `error`;
//! anything else is a decode failure rather than a protocol error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Protocol version tag carried by every message.
pub const JSONRPC_VERSION: &str = "2.0";

// ============================================================================
// SECTION: Outbound Messages
// ============================================================================

/// JSON-RPC request with a client-assigned id.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    /// Protocol version tag.
    pub jsonrpc: &'static str,
    /// Request id.
    pub id: u64,
    /// Method name.
    pub method: String,
    /// Optional parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Builds a request for `method`.
    #[must_use]
    pub fn new(id: u64, method: &str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method: method.to_string(),
            params,
        }
    }
}

/// JSON-RPC notification (no id, no response expected).
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcNotification {
    /// Protocol version tag.
    pub jsonrpc: &'static str,
    /// Method name.
    pub method: String,
    /// Optional parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    /// Builds a notification for `method`.
    #[must_use]
    pub fn new(method: &str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.to_string(),
            params,
        }
    }
}

// ============================================================================
// SECTION: Inbound Messages
// ============================================================================

/// Error object carried by a protocol-level failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "json-rpc error {}: {}", self.code, self.message)
    }
}

/// Exactly one of `result` or `error`.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePayload {
    /// Successful result value.
    Result(Value),
    /// Protocol-level error.
    Error(JsonRpcError),
}

/// Decoded JSON-RPC response.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcResponse {
    /// Response id; `None` only for errors the server could not attribute.
    pub id: Option<u64>,
    /// Result or error payload.
    pub payload: ResponsePayload,
}

impl JsonRpcResponse {
    /// Returns the result value, if this is a success response.
    #[must_use]
    pub const fn result(&self) -> Option<&Value> {
        match &self.payload {
            ResponsePayload::Result(value) => Some(value),
            ResponsePayload::Error(_) => None,
        }
    }

    /// Returns the error object, if this is an error response.
    #[must_use]
    pub const fn error(&self) -> Option<&JsonRpcError> {
        match &self.payload {
            ResponsePayload::Result(_) => None,
            ResponsePayload::Error(error) => Some(error),
        }
    }

    /// Converts the payload into a standard result.
    ///
    /// # Errors
    ///
    /// Returns the [`JsonRpcError`] carried by an error response.
    pub fn into_result(self) -> Result<Value, JsonRpcError> {
        match self.payload {
            ResponsePayload::Result(value) => Ok(value),
            ResponsePayload::Error(error) => Err(error),
        }
    }
}

/// Classification of one inbound line.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// A response to some request.
    Response(JsonRpcResponse),
    /// A server-initiated notification or request (ignored by the client).
    ServerMessage {
        /// Method named by the server.
        method: String,
    },
}

/// Decodes one inbound line.
///
/// # Errors
///
/// Returns a short reason when the line is not JSON, not an object, carries a
/// non-integer id, or carries neither or both of `result` and `error`.
pub fn decode_line(line: &str) -> Result<InboundMessage, String> {
    let value: Value =
        serde_json::from_str(line.trim()).map_err(|err| format!("invalid json: {err}"))?;
    let Value::Object(object) = value else {
        return Err("message is not a json object".to_string());
    };
    if let Some(method) = object.get("method").and_then(Value::as_str) {
        if !object.contains_key("result") && !object.contains_key("error") {
            return Ok(InboundMessage::ServerMessage {
                method: method.to_string(),
            });
        }
    }
    decode_response(&object).map(InboundMessage::Response)
}

/// Decodes a response object, enforcing the result/error exclusivity rule.
fn decode_response(object: &Map<String, Value>) -> Result<JsonRpcResponse, String> {
    let id = match object.get("id") {
        None | Some(Value::Null) => None,
        Some(value) => Some(
            value.as_u64().ok_or_else(|| format!("response id {value} is not an unsigned integer"))?,
        ),
    };
    let payload = match (object.get("result"), object.get("error")) {
        (Some(result), None) => ResponsePayload::Result(result.clone()),
        (None, Some(error)) => {
            let error: JsonRpcError = serde_json::from_value(error.clone())
                .map_err(|err| format!("invalid error object: {err}"))?;
            ResponsePayload::Error(error)
        }
        (Some(_), Some(_)) => return Err("response carries both result and error".to_string()),
        (None, None) => return Err("response carries neither result nor error".to_string()),
    };
    if id.is_none() && matches!(payload, ResponsePayload::Result(_)) {
        return Err("success response is missing its id".to_string());
    }
    Ok(JsonRpcResponse {
        id,
        payload,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use serde_json::json;

    use super::InboundMessage;
    use super::JsonRpcRequest;
    use super::ResponsePayload;
    use super::decode_line;

    #[test]
    fn request_omits_absent_params() {
        let encoded = serde_json::to_string(&JsonRpcRequest::new(7, "tools/list", None)).unwrap();
        assert_eq!(encoded, r#"{"jsonrpc":"2.0","id":7,"method":"tools/list"}"#);
    }

    #[test]
    fn null_result_is_still_a_result() {
        let message = decode_line(r#"{"jsonrpc":"2.0","id":3,"result":null}"#).unwrap();
        let InboundMessage::Response(response) = message else {
            unreachable!("expected a response");
        };
        assert_eq!(response.id, Some(3));
        assert_eq!(response.payload, ResponsePayload::Result(json!(null)));
    }

    #[test]
    fn unattributed_errors_are_accepted() {
        let message =
            decode_line(r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32700,"message":"parse"}}"#)
                .unwrap();
        let InboundMessage::Response(response) = message else {
            unreachable!("expected a response");
        };
        assert_eq!(response.id, None);
        assert_eq!(response.error().map(|error| error.code), Some(-32700));
    }

    #[test]
    fn malformed_responses_are_rejected() {
        assert!(decode_line(r#"{"jsonrpc":"2.0","id":1}"#).is_err());
        assert!(decode_line(r#"{"jsonrpc":"2.0","id":1,"result":1,"error":{}}"#).is_err());
        assert!(decode_line(r#"{"jsonrpc":"2.0","id":"one","result":1}"#).is_err());
        assert!(decode_line(r#"{"jsonrpc":"2.0","result":1}"#).is_err());
        assert!(decode_line("[1,2,3]").is_err());
        assert!(decode_line("not json").is_err());
    }

    #[test]
    fn notifications_are_classified_separately() {
        let message =
            decode_line(r#"{"jsonrpc":"2.0","method":"notifications/message","params":{}}"#)
                .unwrap();
        assert_eq!(
            message,
            InboundMessage::ServerMessage {
                method: "notifications/message".to_string(),
            }
        );
    }
}
