//! Command execution utilities for scheduler queries.

use thiserror::Error;
use tokio::process::Command;

/// Error type for command execution.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Failed to execute {command}: {error}")]
    Execution { command: String, error: String },
}

/// Execute a command and return stdout, treating non-zero exit as OK.
///
/// Slurm commands exit non-zero for ids they no longer know about
/// (`squeue -j` on a finished job, `scontrol show node` on an unknown
/// node). Those are empty results, not failures, so only a command that
/// cannot be spawned is an error.
pub async fn run_command_allow_failure(
    cmd: &mut Command,
    name: &str,
) -> Result<String, CommandError> {
    let output = cmd.output().await.map_err(|e| CommandError::Execution {
        command: name.to_string(),
        error: e.to_string(),
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::debug!(command = name, status = %output.status, stderr = %stderr.trim(), "command exited non-zero");
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
