// crates/studio-mcp-harness/src/bin/studio_mcp_smoke.rs
// ============================================================================
// Module: Smoke CLI
// Description: Five-step sanity check of the MCP server over stdio.
// Purpose: Verify the protocol surface without the mock backend.
// Dependencies: clap, serde_json, studio-mcp-harness, tokio
// ============================================================================

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde_json::Value;
use studio_mcp_harness::HarnessSettings;
use studio_mcp_harness::logging::init_logging;
use studio_mcp_harness::output::emit_error;
use studio_mcp_harness::output::output_error;
use studio_mcp_harness::output::smoke_step_lines;
use studio_mcp_harness::output::write_stdout_line;
use studio_mcp_harness::process::ProcessOptions;
use studio_mcp_harness::smoke::DEFAULT_RESOURCE_URI;
use studio_mcp_harness::smoke::DEFAULT_TOOL;
use studio_mcp_harness::smoke::SmokeOptions;
use studio_mcp_harness::smoke::run_smoke;

// ============================================================================
// SECTION: CLI Definitions
// ============================================================================

/// Smoke test for the Studio MCP server.
#[derive(Debug, Parser)]
#[command(name = "studio-mcp-smoke", version)]
struct Cli {
    /// Server executable under test.
    #[arg(long, value_name = "PATH")]
    server_bin: Option<PathBuf>,
    /// Configuration file passed to the server.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Resource read in step 4.
    #[arg(long, default_value = DEFAULT_RESOURCE_URI)]
    resource_uri: String,
    /// Tool called in step 5.
    #[arg(long, default_value = DEFAULT_TOOL)]
    tool: String,
    /// JSON arguments for the tool call.
    #[arg(long, default_value = r#"{"limit": 1}"#)]
    tool_args: String,
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(message) => emit_error(&message),
    }
}

/// Runs the smoke steps and prints progress.
async fn run() -> Result<ExitCode, String> {
    let cli = Cli::parse();
    let settings = HarnessSettings::load(None).map_err(|err| err.to_string())?;
    init_logging(&settings.log_level);

    let tool_arguments: Value = serde_json::from_str(&cli.tool_args)
        .map_err(|err| format!("--tool-args is not valid json: {err}"))?;
    let mut options = SmokeOptions::new(cli.server_bin.unwrap_or_else(|| settings.server.binary.clone()));
    options.config = cli.config;
    options.resource_uri = cli.resource_uri;
    options.tool = cli.tool;
    options.tool_arguments = tool_arguments;
    options.process = ProcessOptions::from_settings(&settings);

    let print = |line: &str| write_stdout_line(line).map_err(|err| output_error("stdout", &err));
    let rule = "=".repeat(50);
    print("Starting Studio MCP Server test...")?;
    print(&rule)?;

    let mut write_failure = None;
    let outcome = run_smoke(&options, |step| {
        for line in smoke_step_lines(step) {
            if let Err(err) = print(&line) {
                write_failure.get_or_insert(err);
            }
        }
    })
    .await;
    if let Some(err) = write_failure {
        return Err(err);
    }
    match outcome {
        Ok(_) => {
            print("")?;
            print(&rule)?;
            print("Test completed!")?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => Err(format!("Error during testing: {err}")),
    }
}
