//! Bounded external command execution for probes

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, trace};

/// Captured output of a finished command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl CommandOutput {
    /// stdout followed by stderr, the way `2>&1` would interleave them
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// Run `program` with `args`, giving up after `timeout`.
///
/// `None` when the program is missing, cannot be started or does not finish
/// in time; the child is killed in the latter case.
pub async fn run_command(program: &str, args: &[&str], timeout: Duration) -> Option<CommandOutput> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            trace!(program, error = %e, "Probe command unavailable");
            return None;
        }
    };

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => Some(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
        }),
        Ok(Err(e)) => {
            debug!(program, error = %e, "Probe command failed");
            None
        }
        Err(_) => {
            debug!(program, timeout_ms = timeout.as_millis() as u64, "Probe command timed out");
            None
        }
    }
}
