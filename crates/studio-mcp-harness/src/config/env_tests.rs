// crates/studio-mcp-harness/src/config/env_tests.rs
// ============================================================================
// Module: Harness Settings Unit Tests
// Description: Unit coverage for env overrides and settings files.
// Purpose: Ensure configuration parsing fails closed on invalid inputs.
// Dependencies: std, toml
// ============================================================================

//! ## Overview
//! Invariants:
//! - Environment parsing rejects invalid or empty values.
//! - Tests restore environment state after each run.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::OnceLock;
use std::time::Duration;

use super::EnvOverrides;
use super::HarnessEnv;
use super::HarnessSettings;

mod env_mut {
    #![allow(unsafe_code, reason = "Tests mutate process env vars in a controlled scope.")]

    /// Sets an environment variable for the current process.
    pub fn set_var(key: &str, value: &str) {
        // SAFETY: Tests serialize environment mutation via a global lock.
        unsafe {
            std::env::set_var(key, value);
        }
    }

    /// Removes an environment variable from the current process.
    pub fn remove_var(key: &str) {
        // SAFETY: Tests serialize environment mutation via a global lock.
        unsafe {
            std::env::remove_var(key);
        }
    }
}

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(())).lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

struct EnvGuard {
    entries: Vec<(&'static str, Option<String>)>,
}

impl EnvGuard {
    fn new(names: &[&'static str]) -> Self {
        let entries = names
            .iter()
            .map(|name| {
                let previous = std::env::var(*name).ok();
                env_mut::remove_var(name);
                (*name, previous)
            })
            .collect();
        Self {
            entries,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (name, value) in self.entries.drain(..) {
            match value {
                Some(value) => env_mut::set_var(name, &value),
                None => env_mut::remove_var(name),
            }
        }
    }
}

fn env_names() -> [&'static str; 6] {
    [
        HarnessEnv::ServerBinary.as_str(),
        HarnessEnv::MockDir.as_str(),
        HarnessEnv::BackendUrl.as_str(),
        HarnessEnv::TimeoutSeconds.as_str(),
        HarnessEnv::SkipBackend.as_str(),
        HarnessEnv::LogLevel.as_str(),
    ]
}

#[test]
fn timeout_rejects_invalid_values() {
    let _lock = env_lock();
    let _guard = EnvGuard::new(&env_names());

    env_mut::set_var(HarnessEnv::TimeoutSeconds.as_str(), "0");
    assert!(EnvOverrides::load().is_err());

    env_mut::set_var(HarnessEnv::TimeoutSeconds.as_str(), "not-a-number");
    assert!(EnvOverrides::load().is_err());

    env_mut::set_var(HarnessEnv::TimeoutSeconds.as_str(), "   ");
    assert!(EnvOverrides::load().is_err());
}

#[test]
fn timeout_floor_extends_deadlines() {
    let _lock = env_lock();
    let _guard = EnvGuard::new(&env_names());

    env_mut::set_var(HarnessEnv::TimeoutSeconds.as_str(), "120");
    let settings = HarnessSettings::load(None).expect("settings should load");
    assert_eq!(settings.timeout_floor, Some(Duration::from_secs(120)));
    assert_eq!(settings.response_timeout(), Duration::from_secs(120));
    assert_eq!(settings.backend_startup_timeout(), Duration::from_secs(120));
    assert_eq!(settings.server_settle_delay(), Duration::from_secs(2));
}

#[test]
fn skip_backend_parses_bool_values() {
    let _lock = env_lock();
    let _guard = EnvGuard::new(&env_names());

    env_mut::set_var(HarnessEnv::SkipBackend.as_str(), "1");
    let settings = HarnessSettings::load(None).expect("settings should load");
    assert!(!settings.backend.managed);

    env_mut::set_var(HarnessEnv::SkipBackend.as_str(), "false");
    let settings = HarnessSettings::load(None).expect("settings should load");
    assert!(settings.backend.managed);

    env_mut::set_var(HarnessEnv::SkipBackend.as_str(), "maybe");
    assert!(HarnessSettings::load(None).is_err());
}

#[test]
fn path_and_url_overrides_apply() {
    let _lock = env_lock();
    let _guard = EnvGuard::new(&env_names());

    env_mut::set_var(HarnessEnv::ServerBinary.as_str(), "/opt/studio/bin/server");
    env_mut::set_var(HarnessEnv::MockDir.as_str(), "/srv/mock");
    env_mut::set_var(HarnessEnv::BackendUrl.as_str(), "http://127.0.0.1:9090/");
    let settings = HarnessSettings::load(None).expect("settings should load");
    assert_eq!(settings.server.binary, PathBuf::from("/opt/studio/bin/server"));
    assert_eq!(settings.backend.workdir, PathBuf::from("/srv/mock"));
    assert_eq!(settings.backend.base_url, "http://127.0.0.1:9090");
}

#[test]
fn empty_values_fail_closed() {
    let _lock = env_lock();
    let _guard = EnvGuard::new(&env_names());

    env_mut::set_var(HarnessEnv::BackendUrl.as_str(), "");
    assert!(EnvOverrides::load().is_err());
}

#[test]
fn settings_file_overrides_defaults() {
    let settings = HarnessSettings::from_toml_str(
        r#"
log_level = "debug"

[server]
binary = "bin/studio-mcp-server"
args = ["--log-level", "debug"]
settle_delay_ms = 100

[backend]
base_url = "http://127.0.0.1:18080"
up_command = ["podman-compose", "up", "-d"]
"#,
    )
    .expect("settings should parse");
    assert_eq!(settings.log_level, "debug");
    assert_eq!(settings.server.binary, PathBuf::from("bin/studio-mcp-server"));
    assert_eq!(settings.server.args, vec!["--log-level", "debug"]);
    assert_eq!(settings.server_settle_delay(), Duration::from_millis(100));
    assert_eq!(settings.server_stop_grace(), Duration::from_secs(5));
    assert_eq!(settings.backend.up_command[0], "podman-compose");
    assert_eq!(settings.backend.down_command, vec!["docker-compose", "down", "-v"]);
}

#[test]
fn settings_file_rejects_unknown_keys() {
    let result = HarnessSettings::from_toml_str("[server]\nbinnary = \"typo\"\n");
    assert!(result.is_err());
}

#[test]
fn validation_rejects_empty_commands() {
    let mut settings = HarnessSettings::default();
    settings.backend.up_command.clear();
    assert!(settings.validate().is_err());
    settings.backend.managed = false;
    assert!(settings.validate().is_ok());
}
