//! USB hardware probe: SDRs, WiFi adapters and Bluetooth controllers
//!
//! | Device | Source | Id |
//! |--------|--------|----|
//! | HackRF | `hackrf_info` | `hackrf-<serial>` |
//! | USRP (USB) | `uhd_find_devices` | `usrp-<serial>` |
//! | RTL-SDR | `rtl_test -t` | `rtlsdr-<serial>` |
//! | WiFi | `iw dev`, `iw phy <phy> info` | `wifi-<iface>` |
//! | Bluetooth | `hciconfig`, `bluetoothctl show` | `bluetooth-<hci>` |
//!
//! Output parsing is kept in pure functions so it can be tested against
//! captured tool output.

use std::sync::LazyLock;
use std::time::Duration;

use argos_application::ports::hardware_probe::HardwareProbe;
use argos_domain::hardware::entities::{ConnectionType, DetectedDevice, DeviceCapabilities, DeviceCategory};
use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use super::command::run_command;

static RTL_DEVICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(\d+):\s+([^,\n]+),\s+([^,\n]+),\s+SN:\s*(\S+)").expect("valid regex")
});
static IW_CHANNEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\s+\d+(?:\.\d+)?\s+MHz\s+\[(\d+)\](.*)").expect("valid regex")
});
static DBM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\((\d+)(?:\.\d+)?\s+dBm\)").expect("valid regex"));
static HCI_DEVICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(hci\d+):\s+Type:").expect("valid regex"));

pub const HACKRF_VENDOR_ID: &str = "1d50";

/// One `Device Address` block of `uhd_find_devices`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsrpEntry {
    pub serial: Option<String>,
    pub model: Option<String>,
    pub name: Option<String>,
    /// Present for networked devices
    pub addr: Option<String>,
}

/// Capabilities shared by every USRP model we report
pub(crate) fn usrp_capabilities() -> DeviceCapabilities {
    DeviceCapabilities::Sdr {
        min_frequency: 70_000_000,
        max_frequency: 6_000_000_000,
        sample_rate: 61_440_000,
        bandwidth: None,
        can_transmit: true,
        can_receive: true,
        full_duplex: Some(true),
    }
}

pub(crate) const USRP_TOOLS: [&str; 2] = ["spectrum.analysis.usrp", "cellular.analysis.usrp"];

fn field_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let (k, v) = line.trim().split_once(':')?;
    if k.trim().eq_ignore_ascii_case(key) {
        Some(v.trim()).filter(|v| !v.is_empty())
    } else {
        None
    }
}

/// Parse `hackrf_info` output; one device per `Serial number` line
pub fn parse_hackrf_info(output: &str) -> Vec<DetectedDevice> {
    struct Board {
        serial: String,
        firmware: Option<String>,
        part_id: Option<String>,
    }

    let mut boards: Vec<Board> = Vec::new();
    for line in output.lines() {
        if let Some(serial) = field_value(line, "Serial number") {
            boards.push(Board {
                serial: serial.to_string(),
                firmware: None,
                part_id: None,
            });
        } else if let Some(board) = boards.last_mut() {
            if let Some(fw) = field_value(line, "Firmware Version") {
                board.firmware = Some(fw.to_string());
            } else if let Some(part) = field_value(line, "Part ID Number") {
                board.part_id = Some(part.to_string());
            }
        }
    }

    boards
        .into_iter()
        .map(|board| {
            let product_id = match &board.part_id {
                Some(part) if part.contains("604b") => "604b",
                _ => "6089",
            };
            let mut device = DetectedDevice::new(
                format!("hackrf-{}", board.serial),
                "HackRF One",
                DeviceCategory::Sdr,
                ConnectionType::Usb,
                DeviceCapabilities::Sdr {
                    min_frequency: 1_000_000,
                    max_frequency: 6_000_000_000,
                    sample_rate: 20_000_000,
                    bandwidth: Some(20_000_000),
                    can_transmit: true,
                    can_receive: true,
                    full_duplex: Some(false),
                },
            )
            .with_serial(board.serial)
            .with_manufacturer("Great Scott Gadgets")
            .with_model("HackRF One")
            .with_usb_ids(HACKRF_VENDOR_ID, product_id)
            .with_compatible_tools([
                "spectrum.analysis.hackrf",
                "wifi.analysis.hackrf",
                "cellular.analysis.hackrf",
            ]);
            if let Some(fw) = board.firmware {
                device = device.with_firmware(fw);
            }
            device
        })
        .collect()
}

/// Split `uhd_find_devices` output into device blocks
pub fn parse_uhd_find_devices(output: &str) -> Vec<UsrpEntry> {
    let mut entries: Vec<UsrpEntry> = Vec::new();
    let mut current: Option<UsrpEntry> = None;

    for line in output.lines() {
        if line.contains("Device Address") {
            entries.extend(current.take());
            current = Some(UsrpEntry::default());
            continue;
        }
        let Some(entry) = current.as_mut() else {
            continue;
        };
        if let Some(v) = field_value(line, "serial") {
            entry.serial = Some(v.to_string());
        } else if let Some(v) = field_value(line, "type") {
            entry.model = Some(v.to_string());
        } else if let Some(v) = field_value(line, "name") {
            entry.name = Some(v.to_string());
        } else if let Some(v) = field_value(line, "addr") {
            entry.addr = Some(v.to_string());
        }
    }
    entries.extend(current);
    entries
}

/// USB-attached USRPs: blocks with a serial and no network address
pub fn usb_usrps(entries: &[UsrpEntry]) -> Vec<DetectedDevice> {
    entries
        .iter()
        .filter(|e| e.addr.is_none())
        .filter_map(|entry| {
            let serial = entry.serial.as_ref()?;
            let mut device = DetectedDevice::new(
                format!("usrp-{}", serial),
                entry.name.clone().unwrap_or_else(|| "USRP Device".to_string()),
                DeviceCategory::Sdr,
                ConnectionType::Usb,
                usrp_capabilities(),
            )
            .with_serial(serial)
            .with_manufacturer("Ettus Research")
            .with_compatible_tools(USRP_TOOLS);
            if let Some(model) = &entry.model {
                device = device.with_model(model);
            }
            Some(device)
        })
        .collect()
}

/// Parse the device list printed by `rtl_test -t`
pub fn parse_rtl_test(output: &str) -> Vec<DetectedDevice> {
    RTL_DEVICE
        .captures_iter(output)
        .map(|cap| {
            let manufacturer = cap[2].trim();
            let serial = cap[4].trim();
            DetectedDevice::new(
                format!("rtlsdr-{}", serial),
                format!("RTL-SDR {}", manufacturer),
                DeviceCategory::Sdr,
                ConnectionType::Usb,
                DeviceCapabilities::Sdr {
                    min_frequency: 24_000_000,
                    max_frequency: 1_766_000_000,
                    sample_rate: 2_400_000,
                    bandwidth: None,
                    can_transmit: false,
                    can_receive: true,
                    full_duplex: None,
                },
            )
            .with_serial(serial)
            .with_manufacturer(manufacturer)
            .with_model(cap[3].trim())
            .with_compatible_tools(["spectrum.analysis.rtlsdr", "adsb.analysis.rtlsdr"])
        })
        .collect()
}

/// `(interface, phy)` pairs from `iw dev`
pub fn parse_iw_dev(output: &str) -> Vec<(String, Option<String>)> {
    let mut phy: Option<String> = None;
    let mut interfaces = Vec::new();
    for line in output.lines() {
        let line = line.trim();
        if let Some(index) = line.strip_prefix("phy#") {
            phy = Some(format!("phy{}", index.trim()));
        } else if let Some(iface) = line.strip_prefix("Interface ") {
            interfaces.push((iface.trim().to_string(), phy.clone()));
        }
    }
    interfaces
}

/// Radio capabilities from `iw phy <phy> info`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WifiPhy {
    pub monitor: bool,
    pub injection: bool,
    pub bands: Vec<String>,
    pub channels: Vec<u32>,
    pub max_tx_power: Option<u32>,
}

pub fn parse_iw_phy(output: &str) -> WifiPhy {
    let mut phy = WifiPhy {
        monitor: output.lines().any(|l| l.trim() == "* monitor"),
        injection: output.contains("TX frame"),
        ..Default::default()
    };

    let band_markers = [
        ("2.4GHz", ["Band 1:", "2.4 GHz"]),
        ("5GHz", ["Band 2:", "5 GHz"]),
        ("6GHz", ["Band 4:", "6 GHz"]),
    ];
    for (band, markers) in band_markers {
        if markers.iter().any(|m| output.contains(m)) {
            phy.bands.push(band.to_string());
        }
    }

    for cap in IW_CHANNEL.captures_iter(output) {
        let rest = &cap[2];
        if rest.contains("disabled") {
            continue;
        }
        if let Ok(channel) = cap[1].parse::<u32>()
            && !phy.channels.contains(&channel)
        {
            phy.channels.push(channel);
        }
        if let Some(power) = DBM.captures(rest).and_then(|p| p[1].parse::<u32>().ok()) {
            phy.max_tx_power = Some(phy.max_tx_power.map_or(power, |max| max.max(power)));
        }
    }
    phy
}

pub fn wifi_device(interface: &str, phy: &WifiPhy) -> DetectedDevice {
    let tools: &[&str] = if phy.monitor {
        &["wifi.scan.kismet", "wifi.attack.wifite", "wifi.recon.airodump"]
    } else {
        &[]
    };
    DetectedDevice::new(
        format!("wifi-{}", interface),
        format!("WiFi Adapter {}", interface),
        DeviceCategory::Wifi,
        ConnectionType::Usb,
        DeviceCapabilities::Wifi {
            interface: interface.to_string(),
            has_monitor_mode: phy.monitor,
            can_inject: phy.injection,
            frequency_bands: phy.bands.clone(),
            channels: phy.channels.clone(),
            max_tx_power: phy.max_tx_power,
        },
    )
    .with_compatible_tools(tools.iter().copied())
}

/// Controller names (`hci0`, ...) from `hciconfig`
pub fn parse_hciconfig(output: &str) -> Vec<String> {
    HCI_DEVICE
        .captures_iter(output)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// `(ble, classic)` support from `bluetoothctl show`; both assumed when unknown
pub fn parse_bluetoothctl_show(output: Option<&str>) -> (bool, bool) {
    match output {
        Some(out) if !out.trim().is_empty() => (
            out.contains("LE") || out.contains("Low Energy"),
            out.contains("BR/EDR"),
        ),
        _ => (true, true),
    }
}

pub fn bluetooth_device(interface: &str, ble: bool, classic: bool) -> DetectedDevice {
    DetectedDevice::new(
        format!("bluetooth-{}", interface),
        format!("Bluetooth Adapter {}", interface),
        DeviceCategory::Bluetooth,
        ConnectionType::Usb,
        DeviceCapabilities::Bluetooth {
            interface: interface.to_string(),
            has_ble_support: ble,
            has_classic_support: classic,
            version: None,
            manufacturer: None,
        },
    )
    .with_compatible_tools(["bluetooth.scan.bluing", "bluetooth.recon.bluez"])
}

pub struct UsbProbe {
    timeout: Duration,
}

impl UsbProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn output(&self, program: &str, args: &[&str]) -> Option<String> {
        run_command(program, args, self.timeout)
            .await
            .map(|out| out.combined())
    }

    async fn hackrf(&self) -> Vec<DetectedDevice> {
        self.output("hackrf_info", &[])
            .await
            .map(|out| parse_hackrf_info(&out))
            .unwrap_or_default()
    }

    async fn usrp(&self) -> Vec<DetectedDevice> {
        self.output("uhd_find_devices", &[])
            .await
            .map(|out| usb_usrps(&parse_uhd_find_devices(&out)))
            .unwrap_or_default()
    }

    async fn rtlsdr(&self) -> Vec<DetectedDevice> {
        self.output("rtl_test", &["-t"])
            .await
            .map(|out| parse_rtl_test(&out))
            .unwrap_or_default()
    }

    async fn wifi(&self) -> Vec<DetectedDevice> {
        let Some(dev) = self.output("iw", &["dev"]).await else {
            return Vec::new();
        };
        let mut devices = Vec::new();
        for (iface, phy) in parse_iw_dev(&dev) {
            let info = match &phy {
                Some(phy) => self.output("iw", &["phy", phy, "info"]).await,
                None => None,
            };
            let phy = info.map(|out| parse_iw_phy(&out)).unwrap_or_default();
            devices.push(wifi_device(&iface, &phy));
        }
        devices
    }

    async fn bluetooth(&self) -> Vec<DetectedDevice> {
        let Some(hci) = self.output("hciconfig", &[]).await else {
            return Vec::new();
        };
        let controllers = parse_hciconfig(&hci);
        if controllers.is_empty() {
            return Vec::new();
        }
        let show = self.output("bluetoothctl", &["show"]).await;
        let (ble, classic) = parse_bluetoothctl_show(show.as_deref());
        controllers
            .iter()
            .map(|iface| bluetooth_device(iface, ble, classic))
            .collect()
    }
}

#[async_trait]
impl HardwareProbe for UsbProbe {
    fn name(&self) -> &str {
        "usb"
    }

    async fn probe(&self) -> Vec<DetectedDevice> {
        let (hackrf, usrp, rtlsdr, wifi, bluetooth) =
            tokio::join!(self.hackrf(), self.usrp(), self.rtlsdr(), self.wifi(), self.bluetooth());
        let devices: Vec<DetectedDevice> = [hackrf, usrp, rtlsdr, wifi, bluetooth]
            .into_iter()
            .flatten()
            .collect();
        debug!(count = devices.len(), "USB probe finished");
        devices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HACKRF_INFO: &str = "hackrf_info version: 2023.01.1\n\
libhackrf version: 2023.01.1 (0.8)\n\
Found HackRF\n\
Index: 0\n\
Serial number: 0000000000000000457863dc2b2a3c5f\n\
Board ID Number: 2 (HackRF One)\n\
Firmware Version: 2021.03.1 (API:1.04)\n\
Part ID Number: 0xa000cb3c 0x005d4f48\n";

    #[test]
    fn test_parse_hackrf_info() {
        let devices = parse_hackrf_info(HACKRF_INFO);
        assert_eq!(devices.len(), 1);
        let hackrf = &devices[0];
        assert_eq!(hackrf.id, "hackrf-0000000000000000457863dc2b2a3c5f");
        assert_eq!(hackrf.firmware_version.as_deref(), Some("2021.03.1 (API:1.04)"));
        assert_eq!(hackrf.vendor_id.as_deref(), Some("1d50"));
        assert_eq!(hackrf.product_id.as_deref(), Some("6089"));
        assert!(hackrf.supports_tool("spectrum.analysis.hackrf"));
        assert!(matches!(
            hackrf.capabilities,
            DeviceCapabilities::Sdr {
                can_transmit: true,
                max_frequency: 6_000_000_000,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_hackrf_info_without_board() {
        assert!(parse_hackrf_info("No HackRF boards found.\n").is_empty());
    }

    #[test]
    fn test_parse_uhd_find_devices_splits_usb_and_network() {
        let output = "\
--------------------------------------------------
-- UHD Device 0
--------------------------------------------------
Device Address:
    serial: 30AD123
    name: MyB210
    product: B210
    type: b200

--------------------------------------------------
-- UHD Device 1
--------------------------------------------------
Device Address:
    serial: 31C4A5E
    addr: 192.168.10.2
    type: usrp2
";
        let entries = parse_uhd_find_devices(output);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].addr.as_deref(), Some("192.168.10.2"));

        let usb = usb_usrps(&entries);
        assert_eq!(usb.len(), 1);
        assert_eq!(usb[0].id, "usrp-30AD123");
        assert_eq!(usb[0].name, "MyB210");
        assert_eq!(usb[0].model.as_deref(), Some("b200"));
    }

    #[test]
    fn test_parse_rtl_test() {
        let output = "Found 2 device(s):\n  0:  Realtek, RTL2838UHIDIR, SN: 00000001\n  1:  Nooelec, NESDR SMArt v5, SN: 12345678\n\nUsing device 0: Generic RTL2832U OEM\n";
        let devices = parse_rtl_test(output);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].id, "rtlsdr-00000001");
        assert_eq!(devices[0].name, "RTL-SDR Realtek");
        assert_eq!(devices[1].model.as_deref(), Some("NESDR SMArt v5"));
    }

    #[test]
    fn test_parse_iw_dev() {
        let output = "phy#1\n\tInterface wlan1\n\t\tifindex 5\n\t\ttype managed\nphy#0\n\tInterface wlan0\n\t\ttype monitor\n";
        assert_eq!(
            parse_iw_dev(output),
            vec![
                ("wlan1".to_string(), Some("phy1".to_string())),
                ("wlan0".to_string(), Some("phy0".to_string())),
            ]
        );
    }

    #[test]
    fn test_parse_iw_phy() {
        let output = "Wiphy phy1\n\
\tBand 1:\n\
\t\tFrequencies:\n\
\t\t\t* 2412 MHz [1] (20.0 dBm)\n\
\t\t\t* 2417 MHz [2] (20.0 dBm)\n\
\t\t\t* 2484 MHz [14] (disabled)\n\
\tBand 2:\n\
\t\tFrequencies:\n\
\t\t\t* 5180 MHz [36] (23.0 dBm)\n\
\tSupported interface modes:\n\
\t\t * managed\n\
\t\t * monitor\n\
\tSupported TX frame types:\n";
        let phy = parse_iw_phy(output);
        assert!(phy.monitor);
        assert!(phy.injection);
        assert_eq!(phy.bands, vec!["2.4GHz", "5GHz"]);
        assert_eq!(phy.channels, vec![1, 2, 36]);
        assert_eq!(phy.max_tx_power, Some(23));

        let device = wifi_device("wlan1", &phy);
        assert_eq!(device.id, "wifi-wlan1");
        assert!(device.supports_tool("wifi.scan.kismet"));
    }

    #[test]
    fn test_wifi_without_monitor_mode_has_no_tools() {
        let device = wifi_device("wlan0", &WifiPhy::default());
        assert!(device.compatible_tools.is_empty());
    }

    #[test]
    fn test_parse_bluetooth() {
        let output = "hci0:\tType: Primary  Bus: USB\n\tBD Address: 00:1A:7D:DA:71:13  ACL MTU: 310:10\n\tUP RUNNING\n";
        assert_eq!(parse_hciconfig(output), vec!["hci0".to_string()]);

        assert_eq!(
            parse_bluetoothctl_show(Some("Controller 00:1A\n\tRoles: central\n\tUUID: LE Audio\n")),
            (true, false)
        );
        assert_eq!(parse_bluetoothctl_show(None), (true, true));
        assert_eq!(bluetooth_device("hci0", true, true).id, "bluetooth-hci0");
    }
}
