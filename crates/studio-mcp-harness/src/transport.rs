// crates/studio-mcp-harness/src/transport.rs
// ============================================================================
// Module: Stdio Transport Client
// Description: Line-delimited JSON-RPC client over a child process's pipes.
// Purpose: Issue one request at a time and correlate its response by id.
// Dependencies: serde_json, tokio, tracing
// ============================================================================

//! ## Overview
//! Each request is encoded as a single JSON line, written, and flushed
//! immediately. The client then reads lines until it finds the response whose
//! id matches the pending request. Only one request is ever outstanding.
//!
//! Invariants:
//! - Ids start at 1 and advance by one per `send`, whether or not it succeeds.
//! - Every `send` is bounded by the response deadline when one is configured.
//! - Server notifications, blank lines, and stale responses (ids of earlier,
//!   abandoned requests) are skipped while waiting.
//! - A line cut short by the deadline is kept and completed by the next read.
//! - Failures below the protocol layer are returned as [`TransportError`];
//!   protocol errors come back as `Ok` responses carrying an error payload.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::jsonrpc::InboundMessage;
use crate::jsonrpc::JsonRpcNotification;
use crate::jsonrpc::JsonRpcRequest;
use crate::jsonrpc::JsonRpcResponse;
use crate::jsonrpc::ResponsePayload;
use crate::jsonrpc::decode_line;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Framing, stream, and decoding failures scoped to one request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No server process is attached.
    #[error("server process is not running")]
    NotRunning,
    /// The output stream closed before a response arrived.
    #[error("no response from server: output stream closed")]
    Closed,
    /// Reading or writing the pipes failed.
    #[error("stdio io error: {0}")]
    Io(String),
    /// The outbound message could not be encoded.
    #[error("request encoding failed: {0}")]
    Encode(String),
    /// A response line could not be decoded.
    #[error("undecodable response ({reason}): {raw}")]
    Decode {
        /// Raw line as received, without the trailing newline.
        raw: String,
        /// Decoder diagnostic.
        reason: String,
    },
    /// A response arrived for a request that was never sent.
    #[error("response id {actual} does not match pending request {expected}")]
    IdMismatch {
        /// Id of the pending request.
        expected: u64,
        /// Id carried by the response.
        actual: u64,
    },
    /// No response arrived before the deadline.
    #[error("no response to {method} within {}ms", .after.as_millis())]
    Timeout {
        /// Method of the pending request.
        method: String,
        /// Deadline that expired.
        after: Duration,
    },
}

// ============================================================================
// SECTION: Transcript
// ============================================================================

/// One request/response exchange recorded for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptEntry {
    /// 1-based position in the transcript.
    pub sequence: u64,
    /// Request method.
    pub method: String,
    /// Request as sent.
    pub request: Value,
    /// Result or error object, when a response arrived.
    pub response: Option<Value>,
    /// Error message for protocol errors and transport failures.
    pub error: Option<String>,
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// JSON-RPC client over a line-delimited byte stream pair.
#[derive(Debug)]
pub struct StdioTransport<W, R> {
    /// Child's input stream.
    writer: W,
    /// Child's output stream.
    reader: R,
    /// Id assigned to the next request.
    next_id: u64,
    /// Deadline for one response; unbounded when `None`.
    response_timeout: Option<Duration>,
    /// Ordered exchange log.
    transcript: Vec<TranscriptEntry>,
    /// Bytes of a response line not yet terminated.
    pending: Vec<u8>,
}

impl<W, R> StdioTransport<W, R>
where
    W: AsyncWrite + Unpin,
    R: AsyncBufRead + Unpin,
{
    /// Creates a client with no response deadline.
    pub const fn new(writer: W, reader: R) -> Self {
        Self {
            writer,
            reader,
            next_id: 1,
            response_timeout: None,
            transcript: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Sets the per-request response deadline.
    #[must_use]
    pub const fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = Some(timeout);
        self
    }

    /// Returns the id the next request will carry.
    #[must_use]
    pub const fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Returns the exchanges recorded so far.
    #[must_use]
    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    /// Sends one request and waits for its response.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the request cannot be written or no
    /// matching, decodable response line arrives in time.
    pub async fn send(
        &mut self,
        method: &str,
        params: Option<Value>,
    ) -> Result<JsonRpcResponse, TransportError> {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        let request = JsonRpcRequest::new(id, method, params);
        let outcome = self.exchange(&request).await;
        self.record(&request, &outcome);
        outcome
    }

    /// Sends a notification; no response is read.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when encoding or the write fails.
    pub async fn notify(&mut self, method: &str, params: Option<Value>) -> Result<(), TransportError> {
        let notification = JsonRpcNotification::new(method, params);
        let line = encode_line(&notification)?;
        debug!(method, "sending notification");
        write_line(&mut self.writer, &line).await
    }

    /// Writes the request and reads its response within the deadline.
    async fn exchange(&mut self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        let line = encode_line(request)?;
        debug!(method = %request.method, id = request.id, "sending request");
        write_line(&mut self.writer, &line).await?;
        match self.response_timeout {
            Some(after) => tokio::time::timeout(after, self.read_response(request.id))
                .await
                .map_err(|_| TransportError::Timeout {
                    method: request.method.clone(),
                    after,
                })?,
            None => self.read_response(request.id).await,
        }
    }

    /// Reads lines until the response for `id` arrives.
    ///
    /// `read_until` appends into `pending`, so a read cancelled by the
    /// deadline leaves its partial line there for the next request.
    async fn read_response(&mut self, id: u64) -> Result<JsonRpcResponse, TransportError> {
        loop {
            let bytes = self
                .reader
                .read_until(b'\n', &mut self.pending)
                .await
                .map_err(|err| TransportError::Io(err.to_string()))?;
            let raw = std::mem::take(&mut self.pending);
            if bytes == 0 {
                return Err(TransportError::Closed);
            }
            let line = String::from_utf8_lossy(&raw);
            if line.trim().is_empty() {
                continue;
            }
            let message = decode_line(&line).map_err(|reason| TransportError::Decode {
                raw: line.trim_end().to_string(),
                reason,
            })?;
            match message {
                InboundMessage::ServerMessage {
                    method,
                } => {
                    debug!(%method, "skipping server-initiated message");
                }
                InboundMessage::Response(response) => match response.id {
                    Some(actual) if actual < id => {
                        debug!(actual, expected = id, "skipping stale response");
                    }
                    Some(actual) if actual > id => {
                        return Err(TransportError::IdMismatch {
                            expected: id,
                            actual,
                        });
                    }
                    _ => {
                        debug!(id, "received response");
                        return Ok(response);
                    }
                },
            }
        }
    }

    /// Appends one exchange to the transcript.
    fn record(&mut self, request: &JsonRpcRequest, outcome: &Result<JsonRpcResponse, TransportError>) {
        let sequence = u64::try_from(self.transcript.len()).unwrap_or(u64::MAX).saturating_add(1);
        let (response, error) = match outcome {
            Ok(response) => match &response.payload {
                ResponsePayload::Result(value) => (Some(value.clone()), None),
                ResponsePayload::Error(error) => (
                    Some(serde_json::to_value(error).unwrap_or(Value::Null)),
                    Some(error.to_string()),
                ),
            },
            Err(err) => (None, Some(err.to_string())),
        };
        self.transcript.push(TranscriptEntry {
            sequence,
            method: request.method.clone(),
            request: serde_json::to_value(request).unwrap_or(Value::Null),
            response,
            error,
        });
    }
}

// ============================================================================
// SECTION: Framing
// ============================================================================

/// Encodes a message as one newline-terminated line.
fn encode_line<T: Serialize>(message: &T) -> Result<String, TransportError> {
    let mut line =
        serde_json::to_string(message).map_err(|err| TransportError::Encode(err.to_string()))?;
    line.push('\n');
    Ok(line)
}

/// Writes and flushes one line so the child observes it immediately.
async fn write_line(writer: &mut (impl AsyncWrite + Unpin), line: &str) -> Result<(), TransportError> {
    writer
        .write_all(line.as_bytes())
        .await
        .map_err(|err| TransportError::Io(format!("stdio write failed: {err}")))?;
    writer.flush().await.map_err(|err| TransportError::Io(format!("stdio flush failed: {err}")))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
