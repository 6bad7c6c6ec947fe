// crates/studio-mcp-harness/src/bin/studio_mcp_integration.rs
// ============================================================================
// Module: Integration Suite CLI
// Description: Runs the full scenario catalog against the live stack.
// Purpose: Exit 0 only when every scenario passes.
// Dependencies: clap, studio-mcp-harness, tokio
// ============================================================================

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use studio_mcp_harness::HarnessSettings;
use studio_mcp_harness::IntegrationSuite;
use studio_mcp_harness::logging::init_logging;
use studio_mcp_harness::output::emit_error;
use studio_mcp_harness::output::output_error;
use studio_mcp_harness::output::scenario_line;
use studio_mcp_harness::output::summary_lines;
use studio_mcp_harness::output::write_stdout_line;

// ============================================================================
// SECTION: CLI Definitions
// ============================================================================

/// Integration tests for the Studio MCP server and its mock backend.
#[derive(Debug, Parser)]
#[command(name = "studio-mcp-integration", version)]
struct Cli {
    /// TOML settings file layered over the defaults.
    #[arg(long, value_name = "PATH")]
    settings: Option<PathBuf>,
    /// Server executable under test.
    #[arg(long, value_name = "PATH")]
    server_bin: Option<PathBuf>,
    /// Mock backend compose directory.
    #[arg(long, value_name = "DIR")]
    mock_dir: Option<PathBuf>,
    /// Mock backend base URL.
    #[arg(long, value_name = "URL")]
    backend_url: Option<String>,
    /// Do not bring the mock backend up or down.
    #[arg(long)]
    no_backend: bool,
    /// Log level used when `RUST_LOG` is unset.
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    /// Applies flags on top of file and environment settings.
    fn apply(self, settings: &mut HarnessSettings) {
        if let Some(binary) = self.server_bin {
            settings.server.binary = binary;
        }
        if let Some(dir) = self.mock_dir {
            settings.backend.workdir = dir;
        }
        if let Some(url) = self.backend_url {
            settings.backend.base_url = url.trim_end_matches('/').to_string();
        }
        if self.no_backend {
            settings.backend.managed = false;
        }
        if let Some(level) = self.log_level {
            settings.log_level = level;
        }
    }
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

/// Loads settings, runs the suite, and prints the report.
async fn run() -> Result<ExitCode, String> {
    let cli = Cli::parse();
    let mut settings = HarnessSettings::load(cli.settings.as_deref()).map_err(|err| err.to_string())?;
    cli.apply(&mut settings);
    settings.validate().map_err(|err| err.to_string())?;
    init_logging(&settings.log_level);

    let print = |line: &str| write_stdout_line(line).map_err(|err| output_error("stdout", &err));
    print("Starting Studio MCP Integration Tests")?;

    let mut suite = IntegrationSuite::from_settings(settings).map_err(|err| err.to_string())?;
    let mut write_failure = None;
    let outcome = suite
        .run_all_with(|result| {
            if let Err(err) = print(&scenario_line(result)) {
                write_failure.get_or_insert(err);
            }
        })
        .await;
    if let Some(err) = write_failure {
        return Err(err);
    }
    let report = outcome.map_err(|err| format!("Failed to set up test environment: {err}"))?;
    for line in summary_lines(&report) {
        print(&line)?;
    }
    Ok(if report.all_passed() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
