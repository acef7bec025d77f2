//! Known holders of each scarce device

use super::entities::ScarceDevice;
use serde::{Deserialize, Serialize};

/// A process recognised by a substring of its command line
///
/// Used for interpreter-hosted tools whose process name is just `python3`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptPattern {
    pub pattern: String,
    pub label: String,
}

impl ScriptPattern {
    pub fn new(pattern: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            label: label.into(),
        }
    }
}

/// Processes and containers that hold a scarce device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Process names matched exactly
    #[serde(default)]
    pub processes: Vec<String>,
    #[serde(default)]
    pub scripts: Vec<ScriptPattern>,
    /// Containers whose presence means the device is in use
    #[serde(default)]
    pub containers: Vec<String>,
    /// Containers stopped on force release (superset of `containers`)
    #[serde(default)]
    pub cleanup_containers: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl DeviceProfile {
    /// Built-in profile for a device class
    pub fn default_for(device: ScarceDevice) -> Self {
        match device {
            ScarceDevice::Hackrf => {
                let containers = strings(&["openwebrx", "openwebrx-hackrf", "pagermon"]);
                let mut cleanup_containers = containers.clone();
                cleanup_containers.extend(strings(&["hackrf-backend-dev", "hackrf-backend"]));
                Self {
                    processes: strings(&[
                        "hackrf_sweep",
                        "hackrf_transfer",
                        "hackrf_info",
                        "grgsm_livemon",
                        "soapy_connector",
                        "btle_rx",
                        "urh",
                        "TempestSDR",
                        "multimon-ng",
                    ]),
                    scripts: vec![ScriptPattern::new("grgsm_livemon_headless", "GSM Evil")],
                    containers,
                    cleanup_containers,
                }
            }
            ScarceDevice::Alfa => Self {
                processes: strings(&[
                    "kismet",
                    "airodump-ng",
                    "aireplay-ng",
                    "wifite",
                    "bettercap",
                    "hcxdumptool",
                ]),
                ..Self::default()
            },
            ScarceDevice::Bluetooth => Self::default(),
        }
    }

    /// Containers to stop on force release
    pub fn containers_to_stop(&self) -> impl Iterator<Item = &str> {
        let extra = self
            .containers
            .iter()
            .filter(|c| !self.cleanup_containers.contains(c));
        self.cleanup_containers.iter().chain(extra).map(String::as_str)
    }
}
