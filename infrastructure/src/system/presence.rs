//! Physical presence checks for the scarce devices
//!
//! | Device | Check |
//! |--------|-------|
//! | hackrf | `hackrf_info` reports a serial number, else `lsusb` lists `1d50:6089` |
//! | alfa | `lsusb` lists a known Alfa chipset |
//! | bluetooth | an `hci*` entry under `/sys/class/bluetooth` |

use std::path::PathBuf;
use std::time::Duration;

use argos_application::ports::device_presence::DevicePresence;
use argos_application::ports::process_control::{Result, SystemError};
use argos_domain::resource::entities::ScarceDevice;
use async_trait::async_trait;
use tracing::trace;

use crate::probes::command::run_command;

pub const HACKRF_USB_ID: &str = "1d50:6089";

/// USB ids of the chipsets used by Alfa adapters
pub const ALFA_USB_IDS: [&str; 5] = ["0cf3:9271", "148f:7601", "148f:5370", "0bda:8187", "0bda:8812"];

const HACKRF_INFO_TIMEOUT: Duration = Duration::from_secs(3);
const LSUSB_TIMEOUT: Duration = Duration::from_secs(5);

/// Whether `lsusb` output lists any of `ids` (`vvvv:pppp`, case-insensitive)
pub fn lsusb_lists_any(output: &str, ids: &[&str]) -> bool {
    let output = output.to_lowercase();
    ids.iter().any(|id| output.contains(&id.to_lowercase()))
}

pub struct SystemDevicePresence {
    bluetooth_class_dir: PathBuf,
}

impl SystemDevicePresence {
    pub fn new() -> Self {
        Self {
            bluetooth_class_dir: PathBuf::from("/sys/class/bluetooth"),
        }
    }

    pub fn with_bluetooth_class_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.bluetooth_class_dir = dir.into();
        self
    }

    async fn lsusb(&self) -> Option<String> {
        run_command("lsusb", &[], LSUSB_TIMEOUT).await.map(|out| out.stdout)
    }

    async fn hackrf_present(&self) -> Result<bool> {
        let info = run_command("hackrf_info", &[], HACKRF_INFO_TIMEOUT).await;
        if let Some(out) = &info
            && out.combined().contains("Serial number")
        {
            return Ok(true);
        }
        match self.lsusb().await {
            Some(list) => Ok(lsusb_lists_any(&list, &[HACKRF_USB_ID])),
            // hackrf_info ran and saw nothing; trust it
            None if info.is_some() => Ok(false),
            None => Err(SystemError::CommandUnavailable("hackrf_info, lsusb".to_string())),
        }
    }

    async fn alfa_present(&self) -> Result<bool> {
        let list = self
            .lsusb()
            .await
            .ok_or_else(|| SystemError::CommandUnavailable("lsusb".to_string()))?;
        Ok(lsusb_lists_any(&list, &ALFA_USB_IDS))
    }

    async fn bluetooth_present(&self) -> Result<bool> {
        let mut entries = match tokio::fs::read_dir(&self.bluetooth_class_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                trace!(error = %e, "No bluetooth class directory");
                return Ok(false);
            }
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            if entry.file_name().to_string_lossy().starts_with("hci") {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl Default for SystemDevicePresence {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DevicePresence for SystemDevicePresence {
    async fn is_present(&self, device: ScarceDevice) -> Result<bool> {
        match device {
            ScarceDevice::Hackrf => self.hackrf_present().await,
            ScarceDevice::Alfa => self.alfa_present().await,
            ScarceDevice::Bluetooth => self.bluetooth_present().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LSUSB: &str = "\
Bus 001 Device 004: ID 1D50:6089 OpenMoko, Inc. Great Scott Gadgets HackRF One SDR
Bus 001 Device 005: ID 0bda:8812 Realtek Semiconductor Corp. RTL8812AU 802.11a/b/g/n/ac
Bus 002 Device 001: ID 1d6b:0003 Linux Foundation 3.0 root hub
";

    #[test]
    fn test_lsusb_matching_is_case_insensitive() {
        assert!(lsusb_lists_any(LSUSB, &[HACKRF_USB_ID]));
        assert!(lsusb_lists_any(LSUSB, &ALFA_USB_IDS));
        assert!(!lsusb_lists_any("Bus 002 Device 001: ID 1d6b:0003 root hub", &ALFA_USB_IDS));
    }

    #[tokio::test]
    async fn test_bluetooth_presence_from_class_dir() {
        let dir = TempDir::new().unwrap();
        let presence = SystemDevicePresence::new().with_bluetooth_class_dir(dir.path());
        assert!(!presence.is_present(ScarceDevice::Bluetooth).await.unwrap());

        std::fs::create_dir(dir.path().join("hci0")).unwrap();
        assert!(presence.is_present(ScarceDevice::Bluetooth).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_bluetooth_subsystem_is_absent() {
        let presence = SystemDevicePresence::new().with_bluetooth_class_dir("/nonexistent/argos/bluetooth");
        assert!(!presence.is_present(ScarceDevice::Bluetooth).await.unwrap());
    }
}
