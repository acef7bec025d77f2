//! Raw TOML configuration data types
//!
//! These structs mirror the config file. Every field has a default so a
//! partial file (or none at all) yields a working configuration.
//!
//! ```toml
//! [resources]
//! acquire_timeout_ms = 5000
//!
//! [resources.profiles.alfa]
//! processes = ["kismet", "airodump-ng"]
//!
//! [hardware]
//! kismet_url = "http://localhost:2501"
//!
//! [tools."spectrum.sweep"]
//! namespace = "spectrum"
//! binary = "hackrf_sweep"
//! requires_device = "hackrf"
//! transport = { type = "process", command = "hackrf_sweep", args = ["-f", "{start}:{stop}"] }
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use argos_application::{ExecutorConfig, MonitorConfig, ResourceConfig};
use argos_domain::resource::entities::ScarceDevice;
use argos_domain::resource::profile::{DeviceProfile, ScriptPattern};
use argos_domain::tool::entities::ToolDefinition;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("{0} cannot be 0")]
    ZeroDuration(&'static str),

    #[error("invalid tool '{name}': {reason}")]
    InvalidTool { name: String, reason: String },
}

/// Raw `[resources]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileResourcesConfig {
    pub acquire_timeout_ms: u64,
    pub refresh_interval_secs: u64,
    pub ownership_grace_secs: u64,
    pub kill_settle_ms: u64,
    pub container_settle_ms: u64,
    /// Per-device overrides; unset lists keep the built-in profile
    pub profiles: BTreeMap<ScarceDevice, FileProfileOverride>,
}

impl Default for FileResourcesConfig {
    fn default() -> Self {
        Self {
            acquire_timeout_ms: 5_000,
            refresh_interval_secs: 30,
            ownership_grace_secs: 30,
            kill_settle_ms: 2_000,
            container_settle_ms: 3_000,
            profiles: BTreeMap::new(),
        }
    }
}

/// Raw `[resources.profiles.<device>]` override
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProfileOverride {
    pub processes: Option<Vec<String>>,
    pub scripts: Option<Vec<ScriptPattern>>,
    pub containers: Option<Vec<String>>,
    pub cleanup_containers: Option<Vec<String>>,
}

impl FileProfileOverride {
    fn apply(&self, mut profile: DeviceProfile) -> DeviceProfile {
        if let Some(processes) = &self.processes {
            profile.processes = processes.clone();
        }
        if let Some(scripts) = &self.scripts {
            profile.scripts = scripts.clone();
        }
        if let Some(containers) = &self.containers {
            profile.containers = containers.clone();
        }
        if let Some(cleanup) = &self.cleanup_containers {
            profile.cleanup_containers = cleanup.clone();
        }
        profile
    }
}

impl FileResourcesConfig {
    pub fn to_resource_config(&self) -> ResourceConfig {
        let mut config = ResourceConfig::default()
            .with_acquire_timeout(Duration::from_millis(self.acquire_timeout_ms))
            .with_refresh_interval(Duration::from_secs(self.refresh_interval_secs))
            .with_ownership_grace(Duration::from_secs(self.ownership_grace_secs))
            .with_settle_delays(
                Duration::from_millis(self.kill_settle_ms),
                Duration::from_millis(self.container_settle_ms),
            );
        for (device, overrides) in &self.profiles {
            let profile = overrides.apply(DeviceProfile::default_for(*device));
            config = config.with_profile(*device, profile);
        }
        config
    }
}

/// Raw `[hardware]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileHardwareConfig {
    pub monitor_interval_secs: u64,
    /// Bound on each probe command (`hackrf_info`, `iw`, ...)
    pub probe_timeout_ms: u64,
    pub kismet_url: String,
    pub hackrf_api_url: String,
    pub openwebrx_url: String,
    /// Bound on each network service check
    pub service_timeout_ms: u64,
}

impl Default for FileHardwareConfig {
    fn default() -> Self {
        Self {
            monitor_interval_secs: 30,
            probe_timeout_ms: 5_000,
            kismet_url: "http://localhost:2501".to_string(),
            hackrf_api_url: "http://localhost:8092".to_string(),
            openwebrx_url: "http://localhost:8073".to_string(),
            service_timeout_ms: 2_000,
        }
    }
}

impl FileHardwareConfig {
    pub fn to_monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            interval: Duration::from_secs(self.monitor_interval_secs),
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn service_timeout(&self) -> Duration {
        Duration::from_millis(self.service_timeout_ms)
    }
}

/// Raw `[executor]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileExecutorConfig {
    /// Applied by every adapter when a tool sets no timeout of its own
    pub default_timeout_ms: u64,
    pub auto_acquire: bool,
    pub suggestion_limit: usize,
}

impl Default for FileExecutorConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 30_000,
            auto_acquire: true,
            suggestion_limit: 5,
        }
    }
}

impl FileExecutorConfig {
    pub fn to_executor_config(&self) -> ExecutorConfig {
        ExecutorConfig::default()
            .with_auto_acquire(self.auto_acquire)
            .with_suggestion_limit(self.suggestion_limit)
    }
}

/// Raw `[logging]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// JSONL audit log of executions and resource events
    pub execution_log: Option<PathBuf>,
}

/// Raw `[tools.<name>]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileToolConfig {
    /// Executable that must be on `PATH` for the tool to be registered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<String>,
    #[serde(flatten)]
    pub definition: ToolDefinition,
}

impl FileToolConfig {
    /// The definition named after its table key
    pub fn to_definition(&self, name: &str) -> ToolDefinition {
        let mut definition = self.definition.clone();
        if definition.name.is_empty() {
            definition.name = name.to_string();
        }
        definition
    }
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub resources: FileResourcesConfig,
    pub hardware: FileHardwareConfig,
    pub executor: FileExecutorConfig,
    pub logging: FileLoggingConfig,
    pub tools: BTreeMap<String, FileToolConfig>,
}

impl FileConfig {
    /// Reject values that would make the runtime spin or misroute
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let durations = [
            ("resources.acquire_timeout_ms", self.resources.acquire_timeout_ms),
            ("resources.refresh_interval_secs", self.resources.refresh_interval_secs),
            ("hardware.monitor_interval_secs", self.hardware.monitor_interval_secs),
            ("hardware.probe_timeout_ms", self.hardware.probe_timeout_ms),
            ("executor.default_timeout_ms", self.executor.default_timeout_ms),
        ];
        if let Some((field, _)) = durations.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigValidationError::ZeroDuration(field));
        }

        for (name, tool) in &self.tools {
            tool.to_definition(name)
                .validate()
                .map_err(|e| ConfigValidationError::InvalidTool {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }
}
