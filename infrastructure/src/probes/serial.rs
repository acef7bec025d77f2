//! Serial hardware probe: GPS receivers, cellular modems, USB-serial adapters
//!
//! - GPS: tty devices that emit NMEA sentences, plus a running `gpsd`
//! - Cellular: modems listed by ModemManager (`mmcli`)
//! - Generic: USB serial adapters with a sysfs manufacturer
//!
//! Results are deduplicated by device path, earlier sources winning.

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use argos_application::ports::hardware_probe::HardwareProbe;
use argos_domain::hardware::entities::{ConnectionType, DetectedDevice, DeviceCapabilities, DeviceCategory};
use async_trait::async_trait;
use regex::Regex;
use tokio::io::AsyncReadExt;
use tracing::{debug, trace};

use super::command::run_command;

const NMEA_MARKERS: [&str; 5] = ["$GPGGA", "$GPRMC", "$GPGSV", "$GNGGA", "$GNRMC"];
const GPS_TTY_PREFIXES: [&str; 3] = ["ttyUSB", "ttyACM", "ttyAMA"];
const SERIAL_TTY_PREFIXES: [&str; 3] = ["ttyS", "ttyUSB", "ttyACM"];
const NMEA_SAMPLE_BYTES: usize = 1024;
const NMEA_READ_TIMEOUT: Duration = Duration::from_secs(3);
const DEFAULT_GPS_BAUD: u32 = 9600;

static MODEM_PATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/Modem/(\d+)").expect("valid regex"));

pub fn is_nmea(sample: &str) -> bool {
    NMEA_MARKERS.iter().any(|m| sample.contains(m))
}

pub fn is_gps_candidate(name: &str) -> bool {
    GPS_TTY_PREFIXES.iter().any(|p| name.starts_with(p)) || name.contains("gps")
}

pub fn gps_device(name: &str, path: &str) -> DetectedDevice {
    DetectedDevice::new(
        format!("gps-{}", name),
        format!("GPS Module ({})", name),
        DeviceCategory::Gps,
        ConnectionType::Serial,
        DeviceCapabilities::Gps {
            device: path.to_string(),
            protocol: Some("NMEA".to_string()),
            baud_rate: Some(DEFAULT_GPS_BAUD),
            update_rate: Some(1),
        },
    )
    .with_device_path(path)
    .with_baud_rate(DEFAULT_GPS_BAUD)
    .with_compatible_tools(["gps.tracking.nmea"])
}

pub fn gpsd_device() -> DetectedDevice {
    DetectedDevice::new(
        "gps-gpsd",
        "GPS (via GPSD)",
        DeviceCategory::Gps,
        ConnectionType::Virtual,
        DeviceCapabilities::Gps {
            device: "/var/run/gpsd.sock".to_string(),
            protocol: Some("GPSD".to_string()),
            baud_rate: None,
            update_rate: None,
        },
    )
    .with_compatible_tools(["gps.tracking.gpsd"])
}

/// Modem indices from `mmcli -L`
pub fn parse_mmcli_list(output: &str) -> Vec<String> {
    MODEM_PATH
        .captures_iter(output)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Value of the first `key: value` row in `mmcli -m` output
fn mmcli_field(output: &str, key: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let line = line.trim().trim_start_matches('|').trim();
        let (k, v) = line.split_once(':')?;
        k.trim()
            .eq_ignore_ascii_case(key)
            .then(|| v.trim().to_string())
            .filter(|v| !v.is_empty())
    })
}

pub fn parse_mmcli_modem(index: &str, output: &str) -> DetectedDevice {
    let lower = output.to_lowercase();
    let bands: Vec<String> = [("gsm", "GSM"), ("lte", "LTE"), ("5g", "5G")]
        .into_iter()
        .filter(|(needle, _)| lower.contains(needle))
        .map(|(_, band)| band.to_string())
        .collect();

    let name = mmcli_field(output, "model").unwrap_or_else(|| format!("Cellular Modem {}", index));
    let imei = mmcli_field(output, "imei").or_else(|| mmcli_field(output, "equipment id"));

    let mut device = DetectedDevice::new(
        format!("cellular-{}", index),
        name.clone(),
        DeviceCategory::Cellular,
        ConnectionType::Usb,
        DeviceCapabilities::Cellular {
            interface: format!("/dev/cdc-wdm{}", index),
            supported_bands: bands,
            imei,
            sim_status: mmcli_field(output, "state"),
        },
    )
    .with_model(name)
    .with_compatible_tools(["cellular.scan.modem", "cellular.imsi.catcher", "cellular.gsm.evil"]);
    if let Some(manufacturer) = mmcli_field(output, "manufacturer") {
        device = device.with_manufacturer(manufacturer);
    }
    device
}

pub fn generic_serial_device(name: &str, path: &str, manufacturer: &str, product: &str) -> DetectedDevice {
    DetectedDevice::new(
        format!("serial-{}", name),
        format!("{} ({})", product, name),
        DeviceCategory::Serial,
        ConnectionType::Serial,
        DeviceCapabilities::generic(),
    )
    .with_device_path(path)
    .with_manufacturer(manufacturer)
    .with_model(product)
}

/// Keep the first device per device path (or id when there is no path)
pub fn dedup_by_path(devices: Vec<DetectedDevice>) -> Vec<DetectedDevice> {
    let mut seen = HashSet::new();
    devices
        .into_iter()
        .filter(|d| seen.insert(d.device_path.clone().unwrap_or_else(|| d.id.clone())))
        .collect()
}

pub struct SerialProbe {
    timeout: Duration,
    dev_dir: PathBuf,
    tty_class_dir: PathBuf,
}

impl SerialProbe {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            dev_dir: PathBuf::from("/dev"),
            tty_class_dir: PathBuf::from("/sys/class/tty"),
        }
    }

    /// Probe alternative `/dev` and `/sys/class/tty` roots
    pub fn with_roots(mut self, dev_dir: impl Into<PathBuf>, tty_class_dir: impl Into<PathBuf>) -> Self {
        self.dev_dir = dev_dir.into();
        self.tty_class_dir = tty_class_dir.into();
        self
    }

    async fn device_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        let Ok(mut entries) = tokio::fs::read_dir(&self.dev_dir).await else {
            return names;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        names
    }

    async fn read_sample(path: &Path) -> Option<String> {
        let read = async {
            let mut file = tokio::fs::File::open(path).await.ok()?;
            let mut buf = vec![0u8; NMEA_SAMPLE_BYTES];
            let n = file.read(&mut buf).await.ok()?;
            buf.truncate(n);
            Some(String::from_utf8_lossy(&buf).into_owned())
        };
        tokio::time::timeout(NMEA_READ_TIMEOUT, read).await.ok().flatten()
    }

    async fn gps_modules(&self, names: &[String]) -> Vec<DetectedDevice> {
        let mut devices = Vec::new();
        for name in names.iter().filter(|n| is_gps_candidate(n)) {
            let path = self.dev_dir.join(name);
            match Self::read_sample(&path).await {
                Some(sample) if is_nmea(&sample) => {
                    devices.push(gps_device(name, &path.to_string_lossy()));
                }
                _ => trace!(device = %path.display(), "No NMEA output"),
            }
        }

        if let Some(out) = run_command("systemctl", &["is-active", "gpsd"], self.timeout).await
            && out.stdout.trim() == "active"
        {
            devices.push(gpsd_device());
        }
        devices
    }

    async fn cellular_modems(&self) -> Vec<DetectedDevice> {
        let Some(list) = run_command("mmcli", &["-L"], self.timeout).await else {
            return Vec::new();
        };
        let mut devices = Vec::new();
        for index in parse_mmcli_list(&list.stdout) {
            match run_command("mmcli", &["-m", &index], self.timeout).await {
                Some(details) => devices.push(parse_mmcli_modem(&index, &details.stdout)),
                None => debug!(modem = %index, "Failed to query modem details"),
            }
        }
        devices
    }

    /// Manufacturer and product of the USB device behind a tty
    async fn usb_attributes(&self, name: &str) -> Option<(String, String)> {
        let device_dir = tokio::fs::canonicalize(self.tty_class_dir.join(name).join("device"))
            .await
            .ok()?;
        let mut attributes: BTreeMap<&str, String> = BTreeMap::new();
        for dir in device_dir.ancestors().take(4) {
            for key in ["manufacturer", "product"] {
                if attributes.contains_key(key) {
                    continue;
                }
                if let Ok(value) = tokio::fs::read_to_string(dir.join(key)).await
                    && !value.trim().is_empty()
                {
                    attributes.insert(key, value.trim().to_string());
                }
            }
            if attributes.contains_key("manufacturer") {
                break;
            }
        }
        let manufacturer = attributes.remove("manufacturer")?;
        let product = attributes
            .remove("product")
            .unwrap_or_else(|| "Unknown".to_string());
        Some((manufacturer, product))
    }

    async fn generic_serial(&self, names: &[String]) -> Vec<DetectedDevice> {
        let mut devices = Vec::new();
        for name in names
            .iter()
            .filter(|n| SERIAL_TTY_PREFIXES.iter().any(|p| n.starts_with(p)))
        {
            if let Some((manufacturer, product)) = self.usb_attributes(name).await {
                let path = self.dev_dir.join(name);
                devices.push(generic_serial_device(name, &path.to_string_lossy(), &manufacturer, &product));
            }
        }
        devices
    }
}

#[async_trait]
impl HardwareProbe for SerialProbe {
    fn name(&self) -> &str {
        "serial"
    }

    async fn probe(&self) -> Vec<DetectedDevice> {
        let names = self.device_names().await;
        let (gps, cellular, generic) = tokio::join!(
            self.gps_modules(&names),
            self.cellular_modems(),
            self.generic_serial(&names)
        );
        let devices = dedup_by_path(gps.into_iter().chain(cellular).chain(generic).collect());
        debug!(count = devices.len(), "Serial probe finished");
        devices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_nmea_detection() {
        assert!(is_nmea("$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n"));
        assert!(is_nmea("garbage\n$GNRMC,..."));
        assert!(!is_nmea("AT+CSQ\r\nOK"));
    }

    #[test]
    fn test_gps_candidates() {
        assert!(is_gps_candidate("ttyUSB0"));
        assert!(is_gps_candidate("ttyACM1"));
        assert!(is_gps_candidate("gps0"));
        assert!(!is_gps_candidate("ttyS0"));
        assert!(!is_gps_candidate("sda"));
    }

    #[test]
    fn test_parse_mmcli() {
        let list = "    /org/freedesktop/ModemManager1/Modem/0 [Quectel] EC25\n";
        assert_eq!(parse_mmcli_list(list), vec!["0".to_string()]);

        let details = "  --------------------------------\n  General  |                path: /org/freedesktop/ModemManager1/Modem/0\n  --------------------------------\n  Hardware |        manufacturer: Quectel\n           |               model: EC25\n           |   supported: gsm-umts, lte\n           |         equipment id: 861234567890123\n  --------------------------------\n  Status   |               state: registered\n";
        let modem = parse_mmcli_modem("0", details);
        assert_eq!(modem.id, "cellular-0");
        assert_eq!(modem.name, "EC25");
        assert_eq!(modem.manufacturer.as_deref(), Some("Quectel"));
        match modem.capabilities {
            DeviceCapabilities::Cellular {
                supported_bands,
                imei,
                sim_status,
                ..
            } => {
                assert_eq!(supported_bands, vec!["GSM", "LTE"]);
                assert_eq!(imei.as_deref(), Some("861234567890123"));
                assert_eq!(sim_status.as_deref(), Some("registered"));
            }
            other => panic!("unexpected capabilities: {:?}", other),
        }
    }

    #[test]
    fn test_dedup_by_path_keeps_first() {
        let gps = gps_device("ttyUSB0", "/dev/ttyUSB0");
        let generic = generic_serial_device("ttyUSB0", "/dev/ttyUSB0", "u-blox", "GNSS receiver");
        let other = generic_serial_device("ttyUSB1", "/dev/ttyUSB1", "FTDI", "FT232R");

        let devices = dedup_by_path(vec![gps, generic, other]);

        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].id, "gps-ttyUSB0");
        assert_eq!(devices[1].id, "serial-ttyUSB1");
    }

    #[tokio::test]
    async fn test_probe_finds_nmea_and_usb_serial_devices() {
        let root = TempDir::new().unwrap();
        let dev = root.path().join("dev");
        let tty = root.path().join("tty");
        fs::create_dir_all(&dev).unwrap();

        fs::write(dev.join("ttyUSB0"), "$GPRMC,081836,A,3751.65,S,14507.36,E*62\r\n").unwrap();
        fs::write(dev.join("ttyUSB1"), "").unwrap();
        fs::write(dev.join("sda"), "").unwrap();

        let usb1 = tty.join("ttyUSB1");
        fs::create_dir_all(usb1.join("device")).unwrap();
        fs::write(usb1.join("manufacturer"), "FTDI\n").unwrap();
        fs::write(usb1.join("product"), "FT232R USB UART\n").unwrap();

        let probe = SerialProbe::new(Duration::from_millis(500)).with_roots(&dev, &tty);
        let devices = probe.probe().await;

        let gps = devices.iter().find(|d| d.id == "gps-ttyUSB0").unwrap();
        assert_eq!(gps.category, DeviceCategory::Gps);
        assert_eq!(gps.baud_rate, Some(9600));

        let serial = devices.iter().find(|d| d.id == "serial-ttyUSB1").unwrap();
        assert_eq!(serial.manufacturer.as_deref(), Some("FTDI"));
        assert_eq!(serial.name, "FT232R USB UART (ttyUSB1)");

        assert!(!devices.iter().any(|d| d.id.ends_with("sda")));
    }
}
