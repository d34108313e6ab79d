//! Subprocess Execution Module
//!
//! Runs the external audit tools (synthetic audit CLI, accessibility scanner)
//! as child processes and captures their output.

use anyhow::{Context, Result};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Execution result from a subprocess
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Whether the execution was successful
    pub success: bool,
    /// Exit code of the process
    pub exit_code: Option<i32>,
    /// Standard output content
    pub stdout: String,
    /// Standard error content
    pub stderr: String,
    /// Execution duration in milliseconds
    pub duration_ms: u64,
}

impl ExecutionResult {
    /// Readable exit status for error messages
    pub fn status(&self) -> String {
        match self.exit_code {
            Some(code) => format!("exit code {}", code),
            None => "termination by signal".to_string(),
        }
    }

    /// Last non-empty stderr line, or the whole stderr when it has none
    pub fn stderr_summary(&self) -> String {
        self.stderr
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .unwrap_or(self.stderr.trim())
            .trim()
            .to_string()
    }
}

/// Subprocess executor for running external tools
pub struct SubprocessExecutor;

impl SubprocessExecutor {
    /// Execute a command with arguments
    ///
    /// The child is killed when `timeout` expires or the future is dropped.
    pub async fn execute_command(
        command: &str,
        args: &[String],
        timeout: Option<Duration>,
    ) -> Result<ExecutionResult> {
        let start_time = std::time::Instant::now();

        debug!("Executing command: {} with args: {:?}", command, args);

        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let spawned = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn command '{}'", command))?;

        let output = match timeout {
            Some(timeout) => tokio::time::timeout(timeout, spawned.wait_with_output())
                .await
                .with_context(|| {
                    format!(
                        "Command '{}' timed out after {}ms",
                        command,
                        timeout.as_millis()
                    )
                })?
                .context("Failed to wait for command")?,
            None => spawned
                .wait_with_output()
                .await
                .context("Failed to wait for command")?,
        };

        let duration_ms = start_time.elapsed().as_millis() as u64;
        let success = output.status.success();
        let exit_code = output.status.code();

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if success {
            info!(
                "Command '{}' completed successfully in {}ms",
                command, duration_ms
            );
        } else {
            warn!(
                "Command '{}' failed with exit code {:?} in {}ms",
                command, exit_code, duration_ms
            );
            if !stderr.is_empty() {
                debug!("Command stderr: {}", stderr);
            }
        }

        Ok(ExecutionResult {
            success,
            exit_code,
            stdout,
            stderr,
            duration_ms,
        })
    }
}
