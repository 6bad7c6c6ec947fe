// crates/studio-mcp-harness/src/scenario.rs
// ============================================================================
// Module: Scenario Outcomes
// Description: Tri-state scenario outcomes and per-scenario isolation.
// Purpose: Contain every check failure at the scenario boundary.
// Dependencies: futures, thiserror, tracing
// ============================================================================

//! ## Overview
//! A check resolves to `Ok(true)`, `Ok(false)`, an error, or a panic.
//! [`run_scenario`] folds all four into a [`ScenarioOutcome`] so one broken
//! check never aborts the scenarios after it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use tracing::warn;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Unexpected failures raised from inside a check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    /// Something the check depends on is not available.
    #[error("unavailable: {0}")]
    Unavailable(String),
    /// The check hit a state it cannot interpret.
    #[error("{0}")]
    Unexpected(String),
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Result of one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum ScenarioOutcome {
    /// The check returned true.
    Pass,
    /// The check returned false.
    Fail,
    /// The check raised; carries the diagnostic.
    Errored(String),
}

impl ScenarioOutcome {
    /// Returns true for [`ScenarioOutcome::Pass`].
    #[must_use]
    pub const fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

impl fmt::Display for ScenarioOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => f.write_str("PASS"),
            Self::Fail => f.write_str("FAIL"),
            Self::Errored(message) => write!(f, "ERROR: {message}"),
        }
    }
}

/// Named scenario outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioResult {
    /// Scenario name.
    pub name: String,
    /// Outcome.
    pub outcome: ScenarioOutcome,
}

/// Ordered scenario results for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SuiteReport {
    /// Results in run order.
    results: Vec<ScenarioResult>,
}

impl SuiteReport {
    /// Appends one result.
    pub fn push(&mut self, result: ScenarioResult) {
        self.results.push(result);
    }

    /// Returns results in run order.
    #[must_use]
    pub fn results(&self) -> &[ScenarioResult] {
        &self.results
    }

    /// Returns the number of passing scenarios.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|result| result.outcome.is_pass()).count()
    }

    /// Returns the number of scenarios run.
    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Returns true when every scenario passed.
    ///
    /// An empty report never passes.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        !self.results.is_empty() && self.passed() == self.total()
    }

    /// Returns the outcome recorded for `name`.
    #[must_use]
    pub fn outcome(&self, name: &str) -> Option<&ScenarioOutcome> {
        self.results.iter().find(|result| result.name == name).map(|result| &result.outcome)
    }
}

// ============================================================================
// SECTION: Isolation
// ============================================================================

/// Runs one check and records its outcome; never panics or errors.
pub async fn run_scenario<F>(name: &str, check: F) -> ScenarioResult
where
    F: Future<Output = Result<bool, CheckError>>,
{
    info!(scenario = name, "running scenario");
    let outcome = match AssertUnwindSafe(check).catch_unwind().await {
        Ok(Ok(true)) => ScenarioOutcome::Pass,
        Ok(Ok(false)) => ScenarioOutcome::Fail,
        Ok(Err(err)) => ScenarioOutcome::Errored(err.to_string()),
        Err(payload) => ScenarioOutcome::Errored(panic_message(payload.as_ref())),
    };
    if outcome.is_pass() {
        info!(scenario = name, "scenario passed");
    } else {
        warn!(scenario = name, outcome = %outcome, "scenario did not pass");
    }
    ScenarioResult {
        name: name.to_string(),
        outcome,
    }
}

/// Renders a caught panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return format!("check panicked: {message}");
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return format!("check panicked: {message}");
    }
    "check panicked".to_string()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::panic, reason = "Panicking checks are the subject under test.")]

    use super::CheckError;
    use super::ScenarioOutcome;
    use super::SuiteReport;
    use super::run_scenario;

    #[tokio::test]
    async fn check_results_map_to_outcomes() {
        let pass = run_scenario("pass", async { Ok::<bool, CheckError>(true) }).await;
        let fail = run_scenario("fail", async { Ok::<bool, CheckError>(false) }).await;
        let errored = run_scenario("errored", async {
            Err::<bool, CheckError>(CheckError::Unavailable(
                "server process is not running".to_string(),
            ))
        })
        .await;
        assert_eq!(pass.outcome, ScenarioOutcome::Pass);
        assert_eq!(fail.outcome, ScenarioOutcome::Fail);
        assert_eq!(
            errored.outcome,
            ScenarioOutcome::Errored("unavailable: server process is not running".to_string())
        );
    }

    #[tokio::test]
    async fn panicking_check_is_contained() {
        let result = run_scenario("boom", async {
            if true {
                panic!("exploded");
            }
            Ok::<bool, CheckError>(true)
        })
        .await;
        assert_eq!(result.outcome, ScenarioOutcome::Errored("check panicked: exploded".to_string()));
    }

    #[tokio::test]
    async fn report_counts_passes_over_total() {
        let mut report = SuiteReport::default();
        assert!(!report.all_passed());
        report.push(run_scenario("a", async { Ok::<bool, CheckError>(true) }).await);
        assert!(report.all_passed());
        report.push(run_scenario("b", async { Ok::<bool, CheckError>(false) }).await);
        assert_eq!(report.passed(), 1);
        assert_eq!(report.total(), 2);
        assert!(!report.all_passed());
        assert_eq!(report.outcome("b"), Some(&ScenarioOutcome::Fail));
    }
}
