// crates/studio-mcp-harness/src/timeouts.rs
// ============================================================================
// Module: Harness Timeouts
// Description: Default delays and deadlines with an optional global floor.
// Purpose: Keep harness timing consistent across the suite and smoke runner.
// ============================================================================

use std::time::Duration;

/// Wait after spawning the server before it is considered ready.
pub const SERVER_SETTLE_DELAY: Duration = Duration::from_secs(2);
/// Grace period between the termination signal and a forced kill.
pub const SERVER_STOP_GRACE: Duration = Duration::from_secs(5);
/// Deadline for one JSON-RPC response line.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);
/// Wait after the backend bring-up command before the first health probe.
pub const BACKEND_SETTLE_DELAY: Duration = Duration::from_secs(5);
/// Per-request timeout for backend HTTP probes.
pub const BACKEND_PROBE_TIMEOUT: Duration = Duration::from_secs(10);
/// Total budget for the backend to report healthy after bring-up.
pub const BACKEND_STARTUP_TIMEOUT: Duration = Duration::from_secs(60);
/// Interval between health probes during startup.
pub const BACKEND_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Returns the effective timeout, treating `floor` as a minimum.
///
/// The floor comes from `STUDIO_MCP_HARNESS_TIMEOUT_SEC` and never shortens
/// an explicitly longer timeout.
#[must_use]
pub fn resolve_timeout(requested: Duration, floor: Option<Duration>) -> Duration {
    floor.map_or(requested, |floor| std::cmp::max(requested, floor))
}

/// Converts a millisecond setting into a [`Duration`].
#[must_use]
pub const fn millis(value: u64) -> Duration {
    Duration::from_millis(value)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::resolve_timeout;

    #[test]
    fn floor_only_lengthens_timeouts() {
        let short = Duration::from_secs(1);
        let long = Duration::from_secs(90);
        assert_eq!(resolve_timeout(short, Some(Duration::from_secs(10))), Duration::from_secs(10));
        assert_eq!(resolve_timeout(long, Some(Duration::from_secs(10))), long);
        assert_eq!(resolve_timeout(short, None), short);
    }
}
