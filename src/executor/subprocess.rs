//! Native command execution.
//!
//! Runs service-manager commands (`systemctl`, `launchctl`, `start`, ...)
//! with:
//! - No shell interpretation (direct exec)
//! - No timeout; a command blocks for as long as the service manager takes
//! - Captured stdout/stderr

use std::process::{Command, Output, Stdio};
use std::time::Instant;

use tracing::debug;

use crate::error::{CommandErrorKind, DaemonError};

use super::output::sanitize_output;

/// Result of a subprocess execution.
#[derive(Debug, Clone)]
pub struct SubprocessResult {
    /// Whether the command exited successfully (exit code 0).
    pub success: bool,
    /// The exit code, if available.
    pub exit_code: Option<i32>,
    /// Captured stdout as a string.
    pub stdout: String,
    /// Captured stderr as a string.
    pub stderr: String,
}

impl SubprocessResult {
    fn from_output(output: Output) -> Self {
        Self {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }

    /// Turn a non-zero exit into an error that names the command.
    pub fn check(self, display: &str) -> Result<Self, DaemonError> {
        if self.success {
            return Ok(self);
        }
        let detail = if self.stderr.trim().is_empty() {
            sanitize_output(&self.stdout, 5)
        } else {
            sanitize_output(&self.stderr, 5)
        };
        Err(DaemonError::Command {
            kind: CommandErrorKind::ExecutionFailed {
                message: format!(
                    "{} exited with {:?}: {}",
                    display, self.exit_code, detail
                ),
            },
        })
    }
}

/// Builder for subprocess execution.
pub struct SubprocessBuilder {
    program: String,
    args: Vec<String>,
}

impl SubprocessBuilder {
    /// Create a new subprocess builder.
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
        }
    }

    /// Add arguments to the command.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args.extend(args.into_iter().map(|s| s.as_ref().to_string()));
        self
    }

    /// Human-readable form of the command line, for logs and errors.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }

    /// Execute the command and wait for completion.
    pub fn run(self) -> Result<SubprocessResult, DaemonError> {
        debug!(program = %self.program, args = ?self.args, "Executing subprocess");

        let start = Instant::now();
        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| spawn_error(&self.program, e))?;

        let result = SubprocessResult::from_output(output);
        debug!(
            success = result.success,
            exit_code = ?result.exit_code,
            duration_ms = start.elapsed().as_millis(),
            "Subprocess completed"
        );
        Ok(result)
    }
}

fn spawn_error(program: &str, e: std::io::Error) -> DaemonError {
    DaemonError::Command {
        kind: CommandErrorKind::ExecutionFailed {
            message: format!("Failed to spawn {}: {}", program, e),
        },
    }
}

/// Run a native command to completion and fail on a non-zero exit.
///
/// Returns the captured stdout.
pub fn run_native(program: &str, args: &[&str]) -> Result<String, DaemonError> {
    let builder = SubprocessBuilder::new(program).args(args.iter().copied());
    let display = builder.display();
    let result = builder.run()?.check(&display)?;
    Ok(result.stdout)
}

/// Run a native probe command and return its stdout only when it succeeded.
///
/// Probes treat any failure (missing binary, non-zero exit) as "no output".
pub fn probe_native(program: &str, args: &[&str]) -> Option<String> {
    match SubprocessBuilder::new(program).args(args.iter().copied()).run() {
        Ok(result) if result.success => Some(result.stdout),
        Ok(result) => {
            debug!(program, exit_code = ?result.exit_code, "Probe exited unsuccessfully");
            None
        }
        Err(e) => {
            debug!(program, error = %e, "Probe could not run");
            None
        }
    }
}
