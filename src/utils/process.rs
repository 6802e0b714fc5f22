//! Child process helpers for handlers that shell out

use crate::utils::errors::CliError;
use crate::Result;
use std::process::Stdio;
use tokio::process::Command;

/// Captured result of a finished child process
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// Run `program` with piped output and wait for it to exit
///
/// A non-zero exit becomes [`CliError::Process`] carrying the child's stderr.
pub async fn run_captured(program: &str, args: &[String]) -> Result<ProcessOutput> {
    tracing::debug!(program, ?args, "Spawning child process");

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| spawn_error(program, e))?;

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| CliError::unknown(format!("Failed to wait for {}: {}", program, e)))?;

    let result = ProcessOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code(),
    };

    if output.status.success() {
        Ok(result)
    } else {
        Err(CliError::process(program, result.exit_code, result.stderr.trim()))
    }
}

/// Run `program` attached to the current terminal and wait for it to exit
pub async fn run_inherited(program: &str, args: &[String]) -> Result<i32> {
    tracing::debug!(program, ?args, "Spawning interactive child process");

    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(|e| spawn_error(program, e))?;

    match status.code() {
        Some(0) => Ok(0),
        code => Err(CliError::process(program, code, "")),
    }
}

fn spawn_error(program: &str, error: std::io::Error) -> CliError {
    if error.kind() == std::io::ErrorKind::NotFound {
        CliError::not_found(format!("executable '{}' (is it installed and on PATH?)", program))
    } else {
        CliError::unknown(format!("Failed to spawn {}: {}", program, error))
    }
}
