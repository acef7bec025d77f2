//! Process and container control port
//!
//! The resource manager uses this to find processes and containers that hold
//! a scarce device and to terminate them on force release.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from host-level inspection and control
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SystemError {
    #[error("Command failed: {command}: {message}")]
    CommandFailed { command: String, message: String },

    #[error("Command not available: {0}")]
    CommandUnavailable(String),

    #[error("Failed to signal process {pid}: {message}")]
    SignalFailed { pid: u32, message: String },

    #[error("Timed out: {0}")]
    Timeout(String),
}

pub type Result<T> = std::result::Result<T, SystemError>;

/// A running process as seen in the process table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    /// Full command line joined with spaces
    pub cmdline: String,
}

impl ProcessInfo {
    pub fn new(pid: u32, name: impl Into<String>, cmdline: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
            cmdline: cmdline.into(),
        }
    }
}

#[async_trait]
pub trait ProcessControl: Send + Sync {
    /// Snapshot of running processes
    async fn list_processes(&self) -> Result<Vec<ProcessInfo>>;

    /// Forcefully terminate a process
    async fn kill(&self, pid: u32) -> Result<()>;

    /// Names of running containers
    async fn running_containers(&self) -> Result<Vec<String>>;

    async fn stop_container(&self, name: &str) -> Result<()>;
}
