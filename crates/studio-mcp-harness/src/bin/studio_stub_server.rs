// crates/studio-mcp-harness/src/bin/studio_stub_server.rs
// ============================================================================
// Module: Stub Stdio MCP Server
// Description: Minimal line-delimited MCP server for harness tests.
// Purpose: Stand in for the real server with scriptable misbehavior.
// Dependencies: reqwest, serde_json, studio-mcp-harness, tokio
// ============================================================================

//! ## Overview
//! Answers `initialize`, `tools/list`, `resources/list`, `resources/read`,
//! and `tools/call` for the three PLM tools. Tool calls read pipelines from
//! the backend named by the default connection in the configuration file
//! given as the last non-mode argument.
//!
//! `STUDIO_STUB_MODE`, or a `--mode=<name>` argument anywhere on the command
//! line, selects misbehavior:
//! - `exit-at-start`: exit before reading anything.
//! - `exit-on-request`: exit on the first request without answering.
//! - `garbage`: answer every request with a non-JSON line.
//! - `hang`: read requests and never answer.
//! - `ignore-term`: behave normally but ignore SIGTERM and stdin EOF.

use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use serde_json::Value;
use serde_json::json;
use studio_mcp_harness::artifact::StudioConfig;
use studio_mcp_harness::mcp::PROTOCOL_VERSION;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;

// ============================================================================
// SECTION: Modes
// ============================================================================

/// Environment variable selecting the stub's behavior.
const MODE_ENV: &str = "STUDIO_STUB_MODE";

/// Stub behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Answer every request.
    Normal,
    /// Exit before reading stdin.
    ExitAtStart,
    /// Exit on the first request.
    ExitOnRequest,
    /// Reply with non-JSON lines.
    Garbage,
    /// Never reply.
    Hang,
    /// Answer normally; ignore SIGTERM and stdin EOF.
    IgnoreTerm,
}

/// Argument prefix selecting a mode.
const MODE_ARG: &str = "--mode=";

impl Mode {
    /// Maps a mode name; unknown names select [`Mode::Normal`].
    fn parse(name: &str) -> Self {
        match name {
            "exit-at-start" => Self::ExitAtStart,
            "exit-on-request" => Self::ExitOnRequest,
            "garbage" => Self::Garbage,
            "hang" => Self::Hang,
            "ignore-term" => Self::IgnoreTerm,
            _ => Self::Normal,
        }
    }
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Serves line-delimited JSON-RPC on stdio until EOF.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let (modes, paths): (Vec<String>, Vec<String>) =
        std::env::args().skip(1).partition(|arg| arg.starts_with(MODE_ARG));
    let mode = match modes.last().and_then(|arg| arg.strip_prefix(MODE_ARG)) {
        Some(name) => Mode::parse(name),
        None => std::env::var(MODE_ENV).map_or(Mode::Normal, |name| Mode::parse(&name)),
    };
    if mode == Mode::ExitAtStart {
        return ExitCode::from(3);
    }
    #[cfg(unix)]
    let _term_guard = if mode == Mode::IgnoreTerm {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).ok()
    } else {
        None
    };

    let backend = paths.last().and_then(|path| backend_url(Path::new(path)));
    let client = reqwest::Client::builder().timeout(Duration::from_secs(5)).build().ok();
    let server = StubServer {
        backend,
        client,
    };

    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let mut line = String::new();
    loop {
        line.clear();
        match stdin.read_line(&mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        if line.trim().is_empty() {
            continue;
        }
        let reply = match mode {
            Mode::ExitOnRequest => return ExitCode::SUCCESS,
            Mode::Hang => continue,
            Mode::Garbage => Some("this is not json-rpc".to_string()),
            Mode::Normal | Mode::IgnoreTerm | Mode::ExitAtStart => {
                server.handle_line(&line).await.map(|value| value.to_string())
            }
        };
        if let Some(reply) = reply {
            let framed = format!("{reply}\n");
            if stdout.write_all(framed.as_bytes()).await.is_err() || stdout.flush().await.is_err() {
                break;
            }
        }
    }
    if mode == Mode::IgnoreTerm {
        std::future::pending::<()>().await;
    }
    ExitCode::SUCCESS
}

/// Reads the default connection URL from a configuration file.
fn backend_url(path: &Path) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    let config: StudioConfig = serde_json::from_str(&text).ok()?;
    config.default_connection().map(|connection| connection.url.clone())
}

// ============================================================================
// SECTION: Dispatch
// ============================================================================

/// Request dispatcher.
struct StubServer {
    /// Backend base URL from the configuration file.
    backend: Option<String>,
    /// HTTP client for backend calls.
    client: Option<reqwest::Client>,
}

impl StubServer {
    /// Returns the reply for one line, or `None` for notifications.
    async fn handle_line(&self, line: &str) -> Option<Value> {
        let Ok(request) = serde_json::from_str::<Value>(line) else {
            return Some(error_reply(&Value::Null, -32700, "parse error"));
        };
        let id = request.get("id").cloned()?;
        let method = request.get("method").and_then(Value::as_str).unwrap_or_default();
        let params = request.get("params").cloned().unwrap_or_else(|| json!({}));
        let reply = match method {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {"tools": {}, "resources": {}},
                "serverInfo": {"name": "studio-stub-server", "version": env!("CARGO_PKG_VERSION")},
            })),
            "tools/list" => Ok(json!({"tools": [
                {"name": "plm_list_pipelines", "description": "List PLM pipelines"},
                {"name": "plm_resolve_run_id", "description": "Resolve a run id from a pipeline name and run number"},
                {"name": "plm_get_run_log", "description": "Fetch run logs"},
            ]})),
            "resources/list" => Ok(json!({"resources": [
                {"uri": "studio://plm/", "name": "PLM", "mimeType": "application/json"},
            ]})),
            "resources/read" => {
                let uri = params.get("uri").and_then(Value::as_str).unwrap_or_default();
                Ok(json!({"contents": [{"uri": uri, "mimeType": "application/json", "text": "{}"}]}))
            }
            "tools/call" => self.call_tool(&params).await,
            _ => Err((-32601, format!("method not found: {method}"))),
        };
        Some(match reply {
            Ok(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
            Err((code, message)) => error_reply(&id, code, &message),
        })
    }

    /// Runs one PLM tool and wraps its payload as text content.
    async fn call_tool(&self, params: &Value) -> Result<Value, (i64, String)> {
        let name = params.get("name").and_then(Value::as_str).unwrap_or_default();
        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
        let payload = match name {
            "plm_list_pipelines" => match self.pipelines().await {
                Ok(pipelines) => json!({"success": true, "data": pipelines}),
                Err(error) => json!({"success": false, "error": error}),
            },
            "plm_resolve_run_id" | "plm_get_run_log" => {
                match self.resolve_run(&arguments).await {
                    Ok(run_id) if name == "plm_resolve_run_id" => {
                        json!({"success": true, "run_id": run_id})
                    }
                    Ok(run_id) => {
                        let errors_only =
                            arguments.get("errors_only").and_then(Value::as_bool).unwrap_or(false);
                        json!({"success": true, "run_id": run_id, "logs": run_logs(errors_only)})
                    }
                    Err(error) => json!({"success": false, "error": error}),
                }
            }
            _ => return Err((-32602, format!("unknown tool: {name}"))),
        };
        Ok(json!({"content": [{"type": "text", "text": payload.to_string()}]}))
    }

    /// Fetches the backend pipeline list.
    async fn pipelines(&self) -> Result<Vec<Value>, String> {
        let (Some(base), Some(client)) = (&self.backend, &self.client) else {
            return Err("no backend connection configured".to_string());
        };
        let response = client
            .get(format!("{base}/api/plm/pipelines"))
            .send()
            .await
            .map_err(|err| err.to_string())?;
        if !response.status().is_success() {
            return Err(format!("backend returned {}", response.status()));
        }
        response.json::<Vec<Value>>().await.map_err(|err| err.to_string())
    }

    /// Resolves `pipeline_name` and `run_number` to a run id.
    async fn resolve_run(&self, arguments: &Value) -> Result<String, String> {
        let pipeline = arguments.get("pipeline_name").and_then(Value::as_str).unwrap_or_default();
        let run_number = arguments.get("run_number").and_then(Value::as_u64).unwrap_or(0);
        let pipelines = self.pipelines().await?;
        let found = pipelines
            .iter()
            .find(|entry| entry.get("name").and_then(Value::as_str) == Some(pipeline))
            .ok_or_else(|| format!("pipeline not found: {pipeline}"))?;
        let id = found.get("id").and_then(Value::as_str).unwrap_or(pipeline);
        Ok(format!("{id}-run-{run_number}"))
    }
}

/// Canned run log, optionally reduced to errors.
fn run_logs(errors_only: bool) -> Vec<Value> {
    let logs = [
        json!({"level": "INFO", "message": "checkout complete"}),
        json!({"level": "ERROR", "message": "unit tests failed"}),
    ];
    logs.into_iter()
        .filter(|entry| !errors_only || entry["level"] == "ERROR")
        .collect()
}

/// Builds a JSON-RPC error reply.
fn error_reply(id: &Value, code: i64, message: &str) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}})
}
