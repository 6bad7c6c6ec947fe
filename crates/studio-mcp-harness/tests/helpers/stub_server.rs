// crates/studio-mcp-harness/tests/helpers/stub_server.rs
// ============================================================================
// Module: Stub Server Fixtures
// Description: Locates the stub MCP server and builds fast settings for it.
// Purpose: Run the harness end to end without the real server or containers.
// Dependencies: studio-mcp-harness
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use studio_mcp_harness::HarnessSettings;
use studio_mcp_harness::process::ProcessOptions;

/// Returns the path of the stub server built alongside the tests.
pub fn stub_server_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_studio_stub_server"))
}

/// Process options with short waits suited to the stub.
pub fn fast_process_options() -> ProcessOptions {
    ProcessOptions {
        settle_delay: Duration::from_millis(300),
        stop_grace: Duration::from_secs(2),
        response_timeout: Some(Duration::from_secs(5)),
        stderr_log: None,
    }
}

/// Settings pointing the suite at the stub server and a stub backend.
///
/// The orchestration commands are `true`, so bring-up and tear-down succeed
/// without touching any container runtime.
pub fn stub_settings(base_url: &str, workdir: &Path) -> HarnessSettings {
    let mut settings = HarnessSettings::default();
    settings.server.binary = stub_server_bin();
    settings.server.settle_delay_ms = 300;
    settings.server.stop_grace_ms = 2_000;
    settings.server.response_timeout_ms = 5_000;
    settings.backend.workdir = workdir.to_path_buf();
    settings.backend.base_url = base_url.to_string();
    settings.backend.up_command = vec!["true".to_string()];
    settings.backend.down_command = vec!["true".to_string()];
    settings.backend.settle_delay_ms = 0;
    settings.backend.probe_timeout_ms = 2_000;
    settings.backend.startup_timeout_ms = 3_000;
    settings.backend.poll_interval_ms = 50;
    settings
}
