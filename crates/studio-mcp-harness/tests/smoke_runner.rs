// crates/studio-mcp-harness/tests/smoke_runner.rs
// ============================================================================
// Module: Smoke Runner Tests
// Description: Five-step smoke run against the stub server.
// Purpose: Verify step reporting, per-step failure, and startup errors.
// Dependencies: studio-mcp-harness, tokio
// ============================================================================

//! ## Overview
//! Smoke runs without a backend; the stub answers every protocol step.

#![allow(clippy::use_debug, reason = "Test-only diagnostics print unexpected outcomes.")]

mod helpers;

use std::path::PathBuf;

use helpers::stub_server::fast_process_options;
use helpers::stub_server::stub_server_bin;
use studio_mcp_harness::process::ProcessError;
use studio_mcp_harness::smoke::SmokeError;
use studio_mcp_harness::smoke::SmokeOptions;
use studio_mcp_harness::smoke::run_smoke;

/// Smoke options for the stub with fast process timing.
fn stub_options() -> SmokeOptions {
    let mut options = SmokeOptions::new(stub_server_bin());
    options.process = fast_process_options();
    options
}

#[tokio::test]
async fn all_five_steps_pass_against_stub() -> Result<(), Box<dyn std::error::Error>> {
    let mut seen = Vec::new();
    let report = run_smoke(&stub_options(), |step| seen.push(step.number)).await?;
    if seen != [1, 2, 3, 4, 5] {
        return Err(format!("steps reported out of order: {seen:?}").into());
    }
    if report.passed() != 5 {
        let failed: Vec<&str> =
            report.steps.iter().filter(|step| !step.passed).map(|step| step.title.as_str()).collect();
        return Err(format!("failed steps: {failed:?}").into());
    }
    let init = report.steps.first().ok_or("no steps recorded")?;
    if !init.details.iter().any(|line| line == "Server: studio-stub-server") {
        return Err(format!("server name not reported: {:?}", init.details).into());
    }
    Ok(())
}

#[tokio::test]
async fn unknown_tool_fails_only_the_last_step() -> Result<(), Box<dyn std::error::Error>> {
    let mut options = stub_options();
    options.tool = "plm_no_such_tool".to_string();
    let report = run_smoke(&options, |_| {}).await?;
    let outcomes: Vec<bool> = report.steps.iter().map(|step| step.passed).collect();
    if outcomes != [true, true, true, true, false] {
        return Err(format!("unexpected step outcomes: {outcomes:?}").into());
    }
    Ok(())
}

#[tokio::test]
async fn missing_server_reports_start_error() -> Result<(), Box<dyn std::error::Error>> {
    let options = SmokeOptions::new(PathBuf::from("/nonexistent/studio-mcp-server"));
    let mut observed = 0usize;
    match run_smoke(&options, |_| observed += 1).await {
        Err(SmokeError::Start(ProcessError::Spawn { .. })) => {}
        other => return Err(format!("expected spawn failure, got {other:?}").into()),
    }
    if observed != 0 {
        return Err("steps reported without a server".into());
    }
    Ok(())
}

#[tokio::test]
async fn silent_server_fails_initialization() -> Result<(), Box<dyn std::error::Error>> {
    let mut options = stub_options();
    // The stub takes its mode from the argument slot used for the config path.
    options.config = Some(PathBuf::from("--mode=hang"));
    options.process.response_timeout = Some(std::time::Duration::from_millis(200));
    let mut steps = Vec::new();
    match run_smoke(&options, |step| steps.push((step.number, step.passed))).await {
        Err(SmokeError::Initialize(_)) => {}
        other => return Err(format!("expected initialization failure, got {other:?}").into()),
    }
    if steps != [(1, false)] {
        return Err(format!("unexpected steps: {steps:?}").into());
    }
    Ok(())
}
