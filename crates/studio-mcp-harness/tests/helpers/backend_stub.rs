// crates/studio-mcp-harness/tests/helpers/backend_stub.rs
// ============================================================================
// Module: Backend Stub
// Description: Loopback HTTP stand-in for the mock Studio backend.
// Purpose: Serve health, token, and pipeline endpoints without containers.
// Dependencies: axum, tokio
// ============================================================================

use std::net::TcpListener as StdTcpListener;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::get;
use axum::routing::post;
use serde_json::Value;
use serde_json::json;
use tokio::runtime::Builder;
use tokio::sync::oneshot;

/// Pipeline fixture served by the stub.
pub const STUB_PIPELINE: &str = "build-api-service";

/// Shared handler state.
#[derive(Clone)]
struct StubState {
    /// Value reported by the health endpoint.
    health_status: &'static str,
    /// Health requests served so far.
    health_probes: Arc<AtomicUsize>,
}

/// Handle for the backend stub; shuts the server down on drop.
pub struct BackendStubHandle {
    /// Base URL of the bound listener.
    base_url: String,
    /// Health requests served so far.
    health_probes: Arc<AtomicUsize>,
    /// Graceful shutdown trigger.
    shutdown: Option<oneshot::Sender<()>>,
    /// Server thread.
    join: Option<thread::JoinHandle<()>>,
}

impl BackendStubHandle {
    /// Returns the stub base URL (no trailing slash).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns how many health probes the stub has served.
    pub fn health_probes(&self) -> usize {
        self.health_probes.load(Ordering::SeqCst)
    }
}

impl Drop for BackendStubHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// Spawns a stub whose health endpoint reports `health_status`.
pub fn spawn_backend_stub(health_status: &'static str) -> Result<BackendStubHandle, String> {
    let listener = StdTcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("backend stub bind failed: {err}"))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| format!("backend stub listener nonblocking failed: {err}"))?;
    let addr =
        listener.local_addr().map_err(|err| format!("backend stub local addr failed: {err}"))?;

    let health_probes = Arc::new(AtomicUsize::new(0));
    let state = StubState {
        health_status,
        health_probes: Arc::clone(&health_probes),
    };
    let app = Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/token", post(token))
        .route("/api/plm/pipelines", get(pipelines))
        .with_state(state);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let join = thread::spawn(move || {
        let Ok(runtime) = Builder::new_current_thread().enable_all().build() else {
            return;
        };
        runtime.block_on(async move {
            let Ok(listener) = tokio::net::TcpListener::from_std(listener) else {
                return;
            };
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
        });
    });

    Ok(BackendStubHandle {
        base_url: format!("http://{addr}"),
        health_probes,
        shutdown: Some(shutdown_tx),
        join: Some(join),
    })
}

/// Returns a loopback URL with nothing listening behind it.
pub fn closed_backend_url() -> Result<String, String> {
    let listener = StdTcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("closed port bind failed: {err}"))?;
    let addr = listener.local_addr().map_err(|err| format!("closed port addr failed: {err}"))?;
    drop(listener);
    Ok(format!("http://{addr}"))
}

/// Reports the configured health status.
async fn health(State(state): State<StubState>) -> Json<Value> {
    state.health_probes.fetch_add(1, Ordering::SeqCst);
    Json(json!({"status": state.health_status}))
}

/// Issues a token for any credentials.
async fn token(Json(body): Json<Value>) -> Json<Value> {
    let username = body.get("username").and_then(Value::as_str).unwrap_or_default();
    Json(json!({"access_token": format!("stub-token-{username}"), "token_type": "bearer"}))
}

/// Lists the fixture pipelines.
async fn pipelines() -> Json<Value> {
    Json(json!([
        {"id": "pipe-001", "name": STUB_PIPELINE, "status": "active"},
        {"id": "pipe-002", "name": "deploy-frontend", "status": "active"},
    ]))
}
