//! Detected hardware entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Broad class of a detected device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceCategory {
    Sdr,
    Wifi,
    Bluetooth,
    Gps,
    Cellular,
    Serial,
    Network,
    Audio,
    Unknown,
}

impl DeviceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceCategory::Sdr => "sdr",
            DeviceCategory::Wifi => "wifi",
            DeviceCategory::Bluetooth => "bluetooth",
            DeviceCategory::Gps => "gps",
            DeviceCategory::Cellular => "cellular",
            DeviceCategory::Serial => "serial",
            DeviceCategory::Network => "network",
            DeviceCategory::Audio => "audio",
            DeviceCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DeviceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DeviceCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sdr" | "radio" => Ok(DeviceCategory::Sdr),
            "wifi" => Ok(DeviceCategory::Wifi),
            "bluetooth" | "bt" => Ok(DeviceCategory::Bluetooth),
            "gps" => Ok(DeviceCategory::Gps),
            "cellular" => Ok(DeviceCategory::Cellular),
            "serial" => Ok(DeviceCategory::Serial),
            "network" => Ok(DeviceCategory::Network),
            "audio" => Ok(DeviceCategory::Audio),
            "unknown" => Ok(DeviceCategory::Unknown),
            other => Err(format!("unknown device category: {}", other)),
        }
    }
}

/// How the device is attached to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    Usb,
    Network,
    Serial,
    Pci,
    Internal,
    Virtual,
}

impl ConnectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionType::Usb => "usb",
            ConnectionType::Network => "network",
            ConnectionType::Serial => "serial",
            ConnectionType::Pci => "pci",
            ConnectionType::Internal => "internal",
            ConnectionType::Virtual => "virtual",
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last known state of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Connected,
    Disconnected,
    Error,
    Unknown,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Connected => "connected",
            DeviceStatus::Disconnected => "disconnected",
            DeviceStatus::Error => "error",
            DeviceStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category-specific capability attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceCapabilities {
    Sdr {
        /// Lowest tunable frequency in Hz
        min_frequency: u64,
        /// Highest tunable frequency in Hz
        max_frequency: u64,
        /// Maximum sample rate in samples/second
        sample_rate: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bandwidth: Option<u64>,
        can_transmit: bool,
        can_receive: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        full_duplex: Option<bool>,
    },
    Wifi {
        interface: String,
        has_monitor_mode: bool,
        can_inject: bool,
        frequency_bands: Vec<String>,
        channels: Vec<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_tx_power: Option<u32>,
    },
    Bluetooth {
        interface: String,
        has_ble_support: bool,
        has_classic_support: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        manufacturer: Option<String>,
    },
    Gps {
        device: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        protocol: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        baud_rate: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        update_rate: Option<u32>,
    },
    Cellular {
        interface: String,
        supported_bands: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        imei: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sim_status: Option<String>,
    },
    Generic(BTreeMap<String, serde_json::Value>),
}

impl DeviceCapabilities {
    /// Empty generic capability set
    pub fn generic() -> Self {
        DeviceCapabilities::Generic(BTreeMap::new())
    }
}

/// A device found on the host by a probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedDevice {
    /// Deterministic id derived from category and serial/interface
    pub id: String,
    pub name: String,
    pub category: DeviceCategory,
    pub connection: ConnectionType,
    pub status: DeviceStatus,
    pub capabilities: DeviceCapabilities,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bus_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_number: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baud_rate: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firmware_version: Option<String>,

    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,

    /// Names of tools that can drive this device
    #[serde(default)]
    pub compatible_tools: Vec<String>,
}

impl DetectedDevice {
    /// Create a freshly seen, connected device
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: DeviceCategory,
        connection: ConnectionType,
        capabilities: DeviceCapabilities,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            category,
            connection,
            status: DeviceStatus::Connected,
            capabilities,
            vendor_id: None,
            product_id: None,
            serial: None,
            bus_number: None,
            device_number: None,
            ip_address: None,
            port: None,
            hostname: None,
            device_path: None,
            baud_rate: None,
            manufacturer: None,
            model: None,
            driver: None,
            firmware_version: None,
            first_seen: now,
            last_seen: now,
            compatible_tools: Vec::new(),
        }
    }

    pub fn with_usb_ids(mut self, vendor_id: impl Into<String>, product_id: impl Into<String>) -> Self {
        self.vendor_id = Some(vendor_id.into());
        self.product_id = Some(product_id.into());
        self
    }

    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = Some(serial.into());
        self
    }

    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = Some(driver.into());
        self
    }

    pub fn with_firmware(mut self, firmware: impl Into<String>) -> Self {
        self.firmware_version = Some(firmware.into());
        self
    }

    pub fn with_device_path(mut self, path: impl Into<String>) -> Self {
        self.device_path = Some(path.into());
        self
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = Some(baud_rate);
        self
    }

    pub fn with_network(mut self, ip_address: impl Into<String>, port: Option<u16>) -> Self {
        self.ip_address = Some(ip_address.into());
        self.port = port;
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn with_status(mut self, status: DeviceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_compatible_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.compatible_tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_connected(&self) -> bool {
        self.status == DeviceStatus::Connected
    }

    pub fn supports_tool(&self, tool: &str) -> bool {
        self.compatible_tools.iter().any(|t| t == tool)
    }

    /// Case-insensitive match against name, manufacturer, model and id
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        let hit = |s: &str| s.to_lowercase().contains(&needle);
        hit(&self.name)
            || hit(&self.id)
            || self.manufacturer.as_deref().is_some_and(hit)
            || self.model.as_deref().is_some_and(hit)
    }

    /// Record a new status and refresh `last_seen`
    pub fn touch(&mut self, status: DeviceStatus) {
        self.status = status;
        self.last_seen = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hackrf() -> DetectedDevice {
        DetectedDevice::new(
            "hackrf-0000000000000000457863dc2b2a3c5f",
            "HackRF One",
            DeviceCategory::Sdr,
            ConnectionType::Usb,
            DeviceCapabilities::Sdr {
                min_frequency: 1_000_000,
                max_frequency: 6_000_000_000,
                sample_rate: 20_000_000,
                bandwidth: None,
                can_transmit: true,
                can_receive: true,
                full_duplex: Some(false),
            },
        )
        .with_manufacturer("Great Scott Gadgets")
        .with_model("HackRF One")
        .with_compatible_tools(["spectrum.analysis.hackrf"])
    }

    #[test]
    fn test_new_device_is_connected() {
        let device = hackrf();
        assert!(device.is_connected());
        assert_eq!(device.first_seen, device.last_seen);
    }

    #[test]
    fn test_matches_text() {
        let device = hackrf();
        assert!(device.matches_text("hackrf"));
        assert!(device.matches_text("scott"));
        assert!(device.matches_text("457863"));
        assert!(!device.matches_text("alfa"));
    }

    #[test]
    fn test_supports_tool() {
        let device = hackrf();
        assert!(device.supports_tool("spectrum.analysis.hackrf"));
        assert!(!device.supports_tool("wifi.scan.kismet"));
    }

    #[test]
    fn test_touch_updates_status_and_last_seen() {
        let mut device = hackrf();
        let before = device.last_seen;
        device.touch(DeviceStatus::Disconnected);
        assert_eq!(device.status, DeviceStatus::Disconnected);
        assert!(device.last_seen >= before);
    }

    #[test]
    fn test_capabilities_serialize_tagged() {
        let json = serde_json::to_value(&hackrf().capabilities).unwrap();
        assert_eq!(json["kind"], "sdr");
        assert_eq!(json["max_frequency"], 6_000_000_000u64);
        assert!(json.get("bandwidth").is_none());
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!("radio".parse::<DeviceCategory>(), Ok(DeviceCategory::Sdr));
        assert_eq!("WiFi".parse::<DeviceCategory>(), Ok(DeviceCategory::Wifi));
        assert!("toaster".parse::<DeviceCategory>().is_err());
    }
}
