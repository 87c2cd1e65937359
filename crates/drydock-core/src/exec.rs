//! Process execution with a hard timeout
//!
//! One spawned OS process per call. Failures never surface as `Err`: spawn
//! errors, non-zero exits, and timeout kills all come back as data so the
//! orchestrator can classify them.

use std::fmt;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// A fully-materialized external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = String>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().collect(),
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of one external command
#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    /// Exit code, if the process ran and exited on its own
    pub exit_code: Option<i32>,

    /// Captured standard output
    pub stdout: String,

    /// Captured standard error
    pub stderr: String,

    /// The process was killed at the wall-clock timeout boundary
    pub timed_out: bool,

    /// Spawn or wait failure, when the process could not be observed at all
    pub error: Option<String>,
}

impl ExecResult {
    /// Whether the command ran to completion with a zero exit
    #[must_use]
    pub fn ok(&self) -> bool {
        self.exit_code == Some(0) && !self.timed_out && self.error.is_none()
    }
}

/// Run a command, waiting at most `timeout` for it to finish.
///
/// The child is spawned with stdin closed and both output streams captured.
/// On timeout the child is killed and the result reports `timed_out` with no
/// exit code.
pub async fn execute(command: &CommandLine, timeout: Duration) -> ExecResult {
    tracing::debug!(command = %command, timeout_ms = timeout.as_millis() as u64, "executing");

    let child = Command::new(&command.program)
        .args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();

    let child = match child {
        Ok(child) => child,
        Err(e) => {
            return ExecResult {
                error: Some(format!("failed to spawn {}: {e}", command.program)),
                ..ExecResult::default()
            };
        }
    };

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => ExecResult {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            timed_out: false,
            error: None,
        },
        Ok(Err(e)) => ExecResult {
            error: Some(format!("failed to wait on {}: {e}", command.program)),
            ..ExecResult::default()
        },
        // Dropping the wait future kills the child (kill_on_drop).
        Err(_) => ExecResult {
            timed_out: true,
            ..ExecResult::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandLine {
        CommandLine::new("sh", ["-c".to_owned(), script.to_owned()])
    }

    #[tokio::test]
    async fn captures_stdout_and_zero_exit() {
        let result = execute(&sh("echo hello"), Duration::from_secs(5)).await;
        assert!(result.ok());
        assert_eq!(result.stdout.trim(), "hello");
        assert!(result.stderr.is_empty());
    }

    #[tokio::test]
    async fn reports_nonzero_exit_as_data() {
        let result = execute(&sh("echo oops >&2; exit 3"), Duration::from_secs(5)).await;
        assert!(!result.ok());
        assert_eq!(result.exit_code, Some(3));
        assert_eq!(result.stderr.trim(), "oops");
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn kills_at_the_timeout_boundary() {
        let result = execute(&sh("sleep 30"), Duration::from_millis(100)).await;
        assert!(result.timed_out);
        assert_eq!(result.exit_code, None);
        assert!(!result.ok());
    }

    #[tokio::test]
    async fn reports_spawn_failure_as_data() {
        let command = CommandLine::new("/nonexistent/binary", Vec::new());
        let result = execute(&command, Duration::from_secs(1)).await;
        assert!(result.error.is_some());
        assert!(!result.ok());
    }

    #[test]
    fn display_joins_program_and_args() {
        let command = sh("true");
        assert_eq!(command.to_string(), "sh -c true");
    }
}
