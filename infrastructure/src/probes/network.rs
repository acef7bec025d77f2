//! Network hardware probe: networked USRPs and local radio services
//!
//! | Target | Check | Id |
//! |--------|-------|----|
//! | USRP (network) | `uhd_find_devices --args=type=usrp` | `usrp-net-<ip>` |
//! | Kismet | `GET <kismet>/system/status.json` | `kismet-server` |
//! | HackRF API | `GET <hackrf_api>/status` | `hackrf-server` |
//! | OpenWebRX | `GET <openwebrx>/` | `openwebrx-server` |
//!
//! Every HTTP check is bounded by the service timeout; an unreachable
//! service is simply not reported.

use std::collections::BTreeMap;
use std::time::Duration;

use argos_application::ports::hardware_probe::HardwareProbe;
use argos_domain::hardware::entities::{ConnectionType, DetectedDevice, DeviceCapabilities, DeviceCategory};
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use tracing::{debug, trace};

use super::command::run_command;
use super::usb::{USRP_TOOLS, UsrpEntry, parse_uhd_find_devices, usrp_capabilities};

pub const DEFAULT_KISMET_URL: &str = "http://localhost:2501";
pub const DEFAULT_HACKRF_API_URL: &str = "http://localhost:8092";
pub const DEFAULT_OPENWEBRX_URL: &str = "http://localhost:8073";
pub const DEFAULT_SERVICE_TIMEOUT: Duration = Duration::from_secs(2);

/// Networked USRPs: blocks carrying an `addr`
pub fn network_usrps(entries: &[UsrpEntry]) -> Vec<DetectedDevice> {
    entries
        .iter()
        .filter_map(|entry| {
            let addr = entry.addr.as_ref()?;
            let mut device = DetectedDevice::new(
                format!("usrp-net-{}", addr.replace('.', "-")),
                entry
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("USRP ({})", addr)),
                DeviceCategory::Sdr,
                ConnectionType::Network,
                usrp_capabilities(),
            )
            .with_network(addr.clone(), None)
            .with_manufacturer("Ettus Research")
            .with_compatible_tools(USRP_TOOLS);
            if let Some(serial) = &entry.serial {
                device = device.with_serial(serial);
            }
            if let Some(model) = &entry.model {
                device = device.with_model(model);
            }
            Some(device)
        })
        .collect()
}

/// Host and port of a service URL, falling back to localhost and `default_port`
fn endpoint(url: &str, default_port: u16) -> (String, u16) {
    match Url::parse(url) {
        Ok(parsed) => (
            parsed.host_str().unwrap_or("localhost").to_string(),
            parsed.port_or_known_default().unwrap_or(default_port),
        ),
        Err(_) => ("localhost".to_string(), default_port),
    }
}

/// A locally reachable radio service reported as a virtual network device
pub fn service_device(
    id: &str,
    name: &str,
    url: &str,
    default_port: u16,
    details: BTreeMap<String, Value>,
    tools: &[&str],
) -> DetectedDevice {
    let (host, port) = endpoint(url, default_port);
    DetectedDevice::new(
        id,
        name,
        DeviceCategory::Network,
        ConnectionType::Network,
        DeviceCapabilities::Generic(details),
    )
    .with_network(host.clone(), Some(port))
    .with_hostname(host)
    .with_compatible_tools(tools.iter().copied())
}

fn kismet_version(status: &Value) -> Option<String> {
    ["kismet_version", "kismet.system.version"]
        .iter()
        .find_map(|key| status.get(*key))
        .and_then(|v| v.as_str().map(str::to_string).or_else(|| Some(v.to_string())))
}

pub struct NetworkProbe {
    client: reqwest::Client,
    command_timeout: Duration,
    service_timeout: Duration,
    kismet_url: String,
    hackrf_api_url: String,
    openwebrx_url: String,
}

impl NetworkProbe {
    pub fn new(command_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            command_timeout,
            service_timeout: DEFAULT_SERVICE_TIMEOUT,
            kismet_url: DEFAULT_KISMET_URL.to_string(),
            hackrf_api_url: DEFAULT_HACKRF_API_URL.to_string(),
            openwebrx_url: DEFAULT_OPENWEBRX_URL.to_string(),
        }
    }

    // ==================== Builder Methods ====================

    pub fn with_service_timeout(mut self, timeout: Duration) -> Self {
        self.service_timeout = timeout;
        self
    }

    pub fn with_kismet_url(mut self, url: impl Into<String>) -> Self {
        self.kismet_url = url.into();
        self
    }

    pub fn with_hackrf_api_url(mut self, url: impl Into<String>) -> Self {
        self.hackrf_api_url = url.into();
        self
    }

    pub fn with_openwebrx_url(mut self, url: impl Into<String>) -> Self {
        self.openwebrx_url = url.into();
        self
    }

    /// GET `url`; `Some(body)` only for a 2xx answer within the service timeout
    async fn fetch(&self, url: &str) -> Option<String> {
        let response = match self.client.get(url).timeout(self.service_timeout).send().await {
            Ok(response) => response,
            Err(e) => {
                trace!(url, error = %e, "Service unreachable");
                return None;
            }
        };
        if !response.status().is_success() {
            trace!(url, status = response.status().as_u16(), "Service answered with an error");
            return None;
        }
        response.text().await.ok()
    }

    async fn usrps(&self) -> Vec<DetectedDevice> {
        run_command("uhd_find_devices", &["--args=type=usrp"], self.command_timeout)
            .await
            .map(|out| network_usrps(&parse_uhd_find_devices(&out.combined())))
            .unwrap_or_default()
    }

    async fn kismet(&self) -> Option<DetectedDevice> {
        let url = format!("{}/system/status.json", self.kismet_url.trim_end_matches('/'));
        let body = self.fetch(&url).await?;
        let status: Value = serde_json::from_str(&body).unwrap_or(Value::Null);

        let mut details = BTreeMap::new();
        details.insert("service".to_string(), Value::from("kismet"));
        if let Some(version) = kismet_version(&status) {
            details.insert("version".to_string(), Value::from(version));
        }
        Some(service_device(
            "kismet-server",
            "Kismet Server",
            &self.kismet_url,
            2501,
            details,
            &["wifi.scan.kismet", "wifi.monitor.kismet"],
        ))
    }

    async fn hackrf_api(&self) -> Option<DetectedDevice> {
        let url = format!("{}/status", self.hackrf_api_url.trim_end_matches('/'));
        let body = self.fetch(&url).await?;
        let status: Value = serde_json::from_str(&body).unwrap_or(Value::Null);

        let mut details = BTreeMap::new();
        details.insert("service".to_string(), Value::from("hackrf-api"));
        if let Some(version) = status.get("version").and_then(Value::as_str) {
            details.insert("version".to_string(), Value::from(version));
        }
        Some(service_device(
            "hackrf-server",
            "HackRF API Server",
            &self.hackrf_api_url,
            8092,
            details,
            &["spectrum.analysis.hackrf"],
        ))
    }

    async fn openwebrx(&self) -> Option<DetectedDevice> {
        self.fetch(&self.openwebrx_url).await?;
        let mut details = BTreeMap::new();
        details.insert("service".to_string(), Value::from("openwebrx"));
        Some(service_device(
            "openwebrx-server",
            "OpenWebRX Server",
            &self.openwebrx_url,
            8073,
            details,
            &["spectrum.view.openwebrx"],
        ))
    }
}

#[async_trait]
impl HardwareProbe for NetworkProbe {
    fn name(&self) -> &str {
        "network"
    }

    async fn probe(&self) -> Vec<DetectedDevice> {
        let (usrps, kismet, hackrf, openwebrx) =
            tokio::join!(self.usrps(), self.kismet(), self.hackrf_api(), self.openwebrx());
        let devices: Vec<DetectedDevice> = usrps
            .into_iter()
            .chain(kismet)
            .chain(hackrf)
            .chain(openwebrx)
            .collect();
        debug!(count = devices.len(), "Network probe finished");
        devices
    }
}
