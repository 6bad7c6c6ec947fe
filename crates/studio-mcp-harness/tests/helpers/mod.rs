// crates/studio-mcp-harness/tests/helpers/mod.rs
#![allow(dead_code, reason = "Shared helpers are reused across multiple test suites.")]

pub mod backend_stub;
pub mod stub_server;
