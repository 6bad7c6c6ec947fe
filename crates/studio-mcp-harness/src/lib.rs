// crates/studio-mcp-harness/src/lib.rs
// ============================================================================
// Module: Studio MCP Harness Library
// Description: Black-box test harness for the Studio MCP stdio server.
// Purpose: Drive the server under test and its mock backend through scenarios.
// Dependencies: tokio, reqwest, serde, tempfile, thiserror, tracing
// ============================================================================

//! ## Overview
//! This crate drives a JSON-RPC (MCP) server over its stdio pipes, manages the
//! lifecycle of that child process and of the containerized mock backend it
//! talks to, and runs an ordered catalog of independent scenarios against the
//! live stack.
//!
//! Layers, leaves first:
//! - [`transport`]: one outstanding line-delimited JSON-RPC request at a time.
//! - [`process`]: owned child handle with settle delay and graceful stop.
//! - [`backend`]: compose bring-up/tear-down with health-gated startup.
//! - [`suite`]: setup, isolated scenarios, guaranteed teardown.
//! - [`smoke`]: the reduced five-step variant without the backend.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod artifact;
pub mod backend;
pub mod checks;
pub mod config;
pub mod jsonrpc;
pub mod logging;
pub mod mcp;
pub mod output;
pub mod process;
pub mod scenario;
pub mod smoke;
pub mod suite;
pub mod timeouts;
pub mod transport;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use backend::BackendProbe;
pub use backend::ManagedService;
pub use backend::MockBackend;
pub use config::HarnessSettings;
pub use process::ServerProcess;
pub use scenario::ScenarioOutcome;
pub use scenario::ScenarioResult;
pub use scenario::SuiteReport;
pub use suite::IntegrationSuite;
pub use transport::StdioTransport;
pub use transport::TransportError;
