//! Host process table and Docker container control

use std::process::Stdio;
use std::time::Duration;

use argos_application::ports::process_control::{ProcessControl, ProcessInfo, Result, SystemError};
use async_trait::async_trait;
use sysinfo::System;
use tokio::process::Command;
use tracing::{debug, info};

const DOCKER_TIMEOUT: Duration = Duration::from_secs(15);

/// Outcome of a docker invocation: stdout, or `None` when docker is not installed
async fn docker(args: &[&str]) -> Result<Option<String>> {
    let command = format!("docker {}", args.join(" "));
    let mut cmd = Command::new("docker");
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(SystemError::CommandFailed {
                command,
                message: e.to_string(),
            });
        }
    };

    let output = tokio::time::timeout(DOCKER_TIMEOUT, child.wait_with_output())
        .await
        .map_err(|_| SystemError::Timeout(command.clone()))?
        .map_err(|e| SystemError::CommandFailed {
            command: command.clone(),
            message: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(SystemError::CommandFailed {
            command,
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
}

/// Container names from `docker ps --format {{.Names}}` output
pub fn parse_container_names(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// [`ProcessControl`] backed by the real host
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessControl;

impl SystemProcessControl {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessControl for SystemProcessControl {
    async fn list_processes(&self) -> Result<Vec<ProcessInfo>> {
        tokio::task::spawn_blocking(|| {
            let mut system = System::new();
            system.refresh_processes();
            system
                .processes()
                .iter()
                .map(|(pid, process)| ProcessInfo::new(pid.as_u32(), process.name(), process.cmd().join(" ")))
                .collect()
        })
        .await
        .map_err(|e| SystemError::CommandFailed {
            command: "process table scan".to_string(),
            message: e.to_string(),
        })
    }

    #[cfg(target_os = "linux")]
    async fn kill(&self, pid: u32) -> Result<()> {
        let raw = i32::try_from(pid).map_err(|_| SystemError::SignalFailed {
            pid,
            message: "pid out of range".to_string(),
        })?;
        // SAFETY: kill(2) has no memory-safety preconditions.
        let rc = unsafe { libc::kill(raw, libc::SIGKILL) };
        if rc != 0 {
            return Err(SystemError::SignalFailed {
                pid,
                message: std::io::Error::last_os_error().to_string(),
            });
        }
        info!(pid, "Killed process");
        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    async fn kill(&self, pid: u32) -> Result<()> {
        let status = Command::new("kill")
            .args(["-9", &pid.to_string()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| SystemError::SignalFailed {
                pid,
                message: e.to_string(),
            })?;
        if !status.success() {
            return Err(SystemError::SignalFailed {
                pid,
                message: format!("kill exited with {}", status),
            });
        }
        info!(pid, "Killed process");
        Ok(())
    }

    async fn running_containers(&self) -> Result<Vec<String>> {
        match docker(&["ps", "--format", "{{.Names}}"]).await? {
            Some(out) => Ok(parse_container_names(&out)),
            None => {
                debug!("docker not installed, assuming no containers");
                Ok(Vec::new())
            }
        }
    }

    async fn stop_container(&self, name: &str) -> Result<()> {
        match docker(&["stop", name]).await? {
            Some(_) => {
                info!(container = %name, "Stopped container");
                Ok(())
            }
            None => Err(SystemError::CommandUnavailable("docker".to_string())),
        }
    }
}
