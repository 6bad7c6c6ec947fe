// crates/studio-mcp-harness/src/output.rs
// ============================================================================
// Module: Report Output
// Description: Human-readable report lines and stdout/stderr writers.
// Purpose: Keep the report on stdout and diagnostics on stderr.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Rendering is pure; the binaries decide where lines go. Tracing output is
//! always on stderr, so stdout carries only the report.

use std::io::Write;
use std::process::ExitCode;

use crate::scenario::ScenarioOutcome;
use crate::scenario::ScenarioResult;
use crate::scenario::SuiteReport;
use crate::smoke::SmokeStep;

// ============================================================================
// SECTION: Writers
// ============================================================================

/// Writes a line to stdout.
///
/// # Errors
///
/// Returns the underlying I/O error.
pub fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
///
/// # Errors
///
/// Returns the underlying I/O error.
pub fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats a failed write on `stream`.
#[must_use]
pub fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
#[must_use]
pub fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}

// ============================================================================
// SECTION: Suite Rendering
// ============================================================================

/// Renders the line printed when a scenario finishes.
#[must_use]
pub fn scenario_line(result: &ScenarioResult) -> String {
    match &result.outcome {
        ScenarioOutcome::Pass => format!("✅ {} passed", result.name),
        ScenarioOutcome::Fail => format!("❌ {} failed", result.name),
        ScenarioOutcome::Errored(message) => {
            format!("❌ {} failed with exception: {message}", result.name)
        }
    }
}

/// Renders the closing summary.
#[must_use]
pub fn summary_lines(report: &SuiteReport) -> Vec<String> {
    let passed = report.passed();
    let total = report.total();
    let verdict = if report.all_passed() {
        "✅ All tests passed!".to_string()
    } else {
        format!("❌ {} test(s) failed", total - passed)
    };
    vec![String::new(), "Integration Test Summary:".to_string(), format!("Passed: {passed}/{total}"), verdict]
}

// ============================================================================
// SECTION: Smoke Rendering
// ============================================================================

/// Renders one smoke step with its details.
#[must_use]
pub fn smoke_step_lines(step: &SmokeStep) -> Vec<String> {
    let mark = if step.passed { "✓" } else { "✗" };
    let verdict = if step.passed { "successful" } else { "failed" };
    let mut lines = vec![
        String::new(),
        format!("{}. Testing {}...", step.number, step.title),
        format!("{mark} {} {verdict}", capitalize(&step.title)),
    ];
    lines.extend(step.details.iter().map(|detail| format!("  {detail}")));
    lines
}

/// Uppercases the first character.
fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    chars.next().map_or_else(String::new, |first| first.to_uppercase().chain(chars).collect())
}

#[cfg(test)]
mod tests {
    use super::scenario_line;
    use super::smoke_step_lines;
    use super::summary_lines;
    use crate::scenario::ScenarioOutcome;
    use crate::scenario::ScenarioResult;
    use crate::scenario::SuiteReport;
    use crate::smoke::SmokeStep;

    fn result(name: &str, outcome: ScenarioOutcome) -> ScenarioResult {
        ScenarioResult {
            name: name.to_string(),
            outcome,
        }
    }

    #[test]
    fn summary_reports_failures() {
        let mut report = SuiteReport::default();
        report.push(result("Mock Server Health", ScenarioOutcome::Pass));
        report.push(result("PLM List Pipelines", ScenarioOutcome::Fail));
        let lines = summary_lines(&report);
        assert_eq!(lines[2], "Passed: 1/2");
        assert_eq!(lines[3], "❌ 1 test(s) failed");
    }

    #[test]
    fn errored_scenarios_show_the_message() {
        let line =
            scenario_line(&result("MCP Tools List", ScenarioOutcome::Errored("boom".to_string())));
        assert_eq!(line, "❌ MCP Tools List failed with exception: boom");
    }

    #[test]
    fn smoke_steps_render_marks_and_details() {
        let step = SmokeStep {
            number: 4,
            title: "resource reading".to_string(),
            passed: true,
            details: vec!["Got 1 content items".to_string()],
        };
        assert_eq!(
            smoke_step_lines(&step),
            vec![
                String::new(),
                "4. Testing resource reading...".to_string(),
                "✓ Resource reading successful".to_string(),
                "  Got 1 content items".to_string(),
            ]
        );
    }
}
