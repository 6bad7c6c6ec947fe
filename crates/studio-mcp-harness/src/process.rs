// crates/studio-mcp-harness/src/process.rs
// ============================================================================
// Module: Server Process Lifecycle
// Description: Owned child handle for the stdio server under test.
// Purpose: Spawn with a settle delay, stop gracefully, escalate to a kill.
// Dependencies: libc, tokio, tracing
// ============================================================================

//! ## Overview
//! [`ServerProcess`] owns at most one child at a time. The idle state is an
//! explicit variant rather than an absent field, and `stop` always returns the
//! manager to it, so a second `stop` is a no-op.
//!
//! Stop sequence: termination signal, bounded wait for exit, forced kill. The
//! child is also spawned with kill-on-drop so an abandoned manager never
//! leaks a process.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ffi::OsStr;
use std::path::Path;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::BufReader;
use tokio::process::Child;
use tokio::process::ChildStdin;
use tokio::process::ChildStdout;
use tokio::process::Command;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::HarnessSettings;
use crate::timeouts;
use crate::transport::StdioTransport;
use crate::transport::TransportError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Transport bound to a spawned child's pipes.
pub type ServerTransport = StdioTransport<ChildStdin, BufReader<ChildStdout>>;

/// Server process lifecycle errors.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// A child is already owned by this manager.
    #[error("server process already running (pid {0})")]
    AlreadyRunning(u32),
    /// The executable could not be spawned.
    #[error("failed to spawn {path}: {message}")]
    Spawn {
        /// Executable path.
        path: PathBuf,
        /// Spawn error message.
        message: String,
    },
    /// A stdio pipe was not available after spawn.
    #[error("server stdio pipe unavailable: {0}")]
    Pipe(&'static str),
    /// The stderr log file could not be created.
    #[error("failed to create server stderr log {path}: {message}")]
    StderrLog {
        /// Log file path.
        path: PathBuf,
        /// I/O error message.
        message: String,
    },
    /// The child exited before the settle delay elapsed.
    #[error("server exited during startup: {0}")]
    ExitedDuringStartup(String),
}

/// Timing and I/O options for the server process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Wait after spawn before the server is considered ready.
    pub settle_delay: Duration,
    /// Wait after the termination signal before a forced kill.
    pub stop_grace: Duration,
    /// Per-response deadline applied to the transport.
    pub response_timeout: Option<Duration>,
    /// File receiving the child's stderr; inherited when `None`.
    pub stderr_log: Option<PathBuf>,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            settle_delay: timeouts::SERVER_SETTLE_DELAY,
            stop_grace: timeouts::SERVER_STOP_GRACE,
            response_timeout: Some(timeouts::RESPONSE_TIMEOUT),
            stderr_log: None,
        }
    }
}

impl ProcessOptions {
    /// Derives process options from resolved harness settings.
    #[must_use]
    pub fn from_settings(settings: &HarnessSettings) -> Self {
        Self {
            settle_delay: settings.server_settle_delay(),
            stop_grace: settings.server_stop_grace(),
            response_timeout: Some(settings.response_timeout()),
            stderr_log: settings.server.stderr_log.clone(),
        }
    }
}

/// Running child and the transport over its pipes.
#[derive(Debug)]
struct RunningServer {
    /// Child handle.
    child: Child,
    /// Transport over the child's pipes.
    transport: ServerTransport,
}

/// Ownership state of the manager.
#[derive(Debug)]
enum ProcessState {
    /// No child is owned.
    Idle,
    /// One child is owned.
    Running(Box<RunningServer>),
}

// ============================================================================
// SECTION: Manager
// ============================================================================

/// Lifecycle manager for the server under test.
#[derive(Debug)]
pub struct ServerProcess {
    /// Timing and I/O options.
    options: ProcessOptions,
    /// Owned child, if any.
    state: ProcessState,
}

impl ServerProcess {
    /// Creates an idle manager.
    #[must_use]
    pub const fn new(options: ProcessOptions) -> Self {
        Self {
            options,
            state: ProcessState::Idle,
        }
    }

    /// Spawns `executable` with `args` and waits the settle delay.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] when a child is already owned, the spawn
    /// fails, or the child exits before the settle delay elapses. The manager
    /// stays idle on every error path.
    pub async fn start<I, S>(&mut self, executable: &Path, args: I) -> Result<(), ProcessError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        if let ProcessState::Running(running) = &self.state {
            return Err(ProcessError::AlreadyRunning(running.child.id().unwrap_or(0)));
        }
        let stderr = self.stderr_target()?;
        let mut child = Command::new(executable)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(stderr)
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| ProcessError::Spawn {
                path: executable.to_path_buf(),
                message: err.to_string(),
            })?;
        let stdin = child.stdin.take().ok_or(ProcessError::Pipe("stdin"))?;
        let stdout = child.stdout.take().ok_or(ProcessError::Pipe("stdout"))?;
        let pid = child.id().unwrap_or(0);
        info!(pid, executable = %executable.display(), "server process spawned");

        tokio::time::sleep(self.options.settle_delay).await;
        if let Ok(Some(status)) = child.try_wait() {
            return Err(ProcessError::ExitedDuringStartup(status.to_string()));
        }

        let mut transport = StdioTransport::new(stdin, BufReader::new(stdout));
        if let Some(timeout) = self.options.response_timeout {
            transport = transport.with_response_timeout(timeout);
        }
        self.state = ProcessState::Running(Box::new(RunningServer {
            child,
            transport,
        }));
        Ok(())
    }

    /// Stops the owned child, if any.
    ///
    /// Sends a termination signal, waits up to the stop grace period, then
    /// kills. The manager is idle afterwards regardless of how the child
    /// ended; failures are logged.
    pub async fn stop(&mut self) {
        let ProcessState::Running(running) = std::mem::replace(&mut self.state, ProcessState::Idle)
        else {
            return;
        };
        let RunningServer {
            mut child,
            transport,
        } = *running;
        drop(transport);
        let pid = child.id().unwrap_or(0);

        if let Ok(Some(status)) = child.try_wait() {
            debug!(pid, %status, "server process had already exited");
            return;
        }
        if !request_termination(&mut child) {
            warn!(pid, "termination signal could not be delivered");
        }
        match tokio::time::timeout(self.options.stop_grace, child.wait()).await {
            Ok(Ok(status)) => info!(pid, %status, "server process stopped"),
            Ok(Err(err)) => warn!(pid, error = %err, "waiting for server process failed"),
            Err(_) => {
                warn!(pid, grace_ms = self.options.stop_grace.as_millis(), "server ignored termination; killing");
                if let Err(err) = child.kill().await {
                    warn!(pid, error = %err, "server process kill failed");
                }
            }
        }
    }

    /// Returns true while a child is owned.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self.state, ProcessState::Running(_))
    }

    /// Returns true when the owned child has exited on its own.
    pub fn has_exited(&mut self) -> bool {
        match &mut self.state {
            ProcessState::Idle => false,
            ProcessState::Running(running) => !matches!(running.child.try_wait(), Ok(None)),
        }
    }

    /// Returns the owned child's pid.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        match &self.state {
            ProcessState::Idle => None,
            ProcessState::Running(running) => running.child.id(),
        }
    }

    /// Returns the transport over the owned child's pipes.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotRunning`] when the manager is idle.
    pub fn transport_mut(&mut self) -> Result<&mut ServerTransport, TransportError> {
        match &mut self.state {
            ProcessState::Idle => Err(TransportError::NotRunning),
            ProcessState::Running(running) => Ok(&mut running.transport),
        }
    }

    /// Opens the stderr destination for a new child.
    fn stderr_target(&self) -> Result<Stdio, ProcessError> {
        let Some(path) = &self.options.stderr_log else {
            return Ok(Stdio::inherit());
        };
        let file = std::fs::File::create(path).map_err(|err| ProcessError::StderrLog {
            path: path.clone(),
            message: err.to_string(),
        })?;
        Ok(Stdio::from(file))
    }
}

// ============================================================================
// SECTION: Signals
// ============================================================================

/// Asks the child to terminate; returns false when the request failed.
#[cfg(unix)]
#[allow(unsafe_code, reason = "SIGTERM delivery needs kill(2).")]
fn request_termination(child: &mut Child) -> bool {
    let Some(pid) = child.id() else {
        return false;
    };
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // SAFETY: kill(2) has no memory preconditions; the pid belongs to a child
    // this handle has not yet reaped, so it cannot have been recycled.
    let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
    rc == 0
}

/// Asks the child to terminate; returns false when the request failed.
#[cfg(not(unix))]
fn request_termination(child: &mut Child) -> bool {
    child.start_kill().is_ok()
}
