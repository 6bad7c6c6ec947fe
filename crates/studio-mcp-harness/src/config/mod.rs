// crates/studio-mcp-harness/src/config/mod.rs
// ============================================================================
// Module: Harness Configuration
// Description: Typed harness settings with file and environment layering.
// Purpose: Provide one resolved settings value to the suite and smoke runner.
// Dependencies: serde, toml
// ============================================================================

//! ## Overview
//! Harness settings start from built-in defaults, are optionally replaced by a
//! TOML settings file, and are then adjusted by `STUDIO_MCP_HARNESS_*`
//! environment overrides. Command-line flags are applied last by the binaries.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod env;
mod settings;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod env_tests;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use env::EnvOverrides;
pub use env::HarnessEnv;
pub use env::read_env_strict;
pub use settings::BackendSettings;
pub use settings::HarnessSettings;
pub use settings::ServerSettings;
pub use settings::SettingsError;
