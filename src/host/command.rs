//! Bounded-latency helper for running host tooling

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use super::HostError;

/// Locate `binary` on PATH, falling back to the bare name
pub(crate) fn resolve_binary(binary: &str) -> PathBuf {
    which::which(binary).unwrap_or_else(|_| PathBuf::from(binary))
}

/// Run `program` with `args`, returning trimmed stdout on success.
///
/// The child is killed if it outlives `timeout`.
pub(crate) async fn run(
    program: &Path,
    args: &[String],
    timeout: Duration,
) -> Result<String, HostError> {
    let display = program.display().to_string();
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, command.output()).await {
        Ok(result) => result.map_err(|source| HostError::Spawn {
            program: display.clone(),
            source,
        })?,
        Err(_) => return Err(HostError::Timeout(timeout_millis(timeout))),
    };

    if !output.status.success() {
        return Err(HostError::CommandFailed {
            program: display,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Timeout in whole milliseconds, saturating for durations beyond `u64`
fn timeout_millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}
