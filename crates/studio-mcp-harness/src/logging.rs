// crates/studio-mcp-harness/src/logging.rs
// ============================================================================
// Module: Logging
// Description: Structured diagnostics on stderr.
// Purpose: Keep stdout free for the report while logging harness activity.
// Dependencies: tracing-subscriber
// ============================================================================

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs the global subscriber writing to stderr.
///
/// `RUST_LOG` wins when set; otherwise `default_level` applies. Calling this
/// twice leaves the first subscriber in place.
pub fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}
