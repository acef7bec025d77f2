//! Hardware Registry
//!
//! In-memory catalog of [`DetectedDevice`]s keyed by id. Devices are never
//! removed: a device that disappears is marked disconnected.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use argos_domain::hardware::{
    entities::{ConnectionType, DetectedDevice, DeviceCategory, DeviceStatus},
    query::{DeviceQuery, DeviceStats},
};

/// Observer of registry changes
pub trait HardwareHook: Send + Sync {
    fn on_device_registered(&self, _device: &DetectedDevice) {}

    fn on_status_changed(&self, _id: &str, _previous: DeviceStatus, _current: DeviceStatus) {}
}

#[derive(Default)]
pub struct HardwareRegistry {
    devices: RwLock<BTreeMap<String, DetectedDevice>>,
    hooks: RwLock<Vec<Arc<dyn HardwareHook>>>,
}

impl HardwareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_hook(&self, hook: Arc<dyn HardwareHook>) {
        self.hooks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(hook);
    }

    fn hooks(&self) -> Vec<Arc<dyn HardwareHook>> {
        self.hooks.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Insert or replace a device; an existing entry keeps its `first_seen`
    pub fn register(&self, mut device: DetectedDevice) {
        {
            let mut devices = self.devices.write().unwrap_or_else(|e| e.into_inner());
            if let Some(existing) = devices.get(&device.id) {
                device.first_seen = existing.first_seen;
            }
            devices.insert(device.id.clone(), device.clone());
        }
        tracing::debug!(device = %device.id, category = %device.category, "Registered device");
        for hook in self.hooks() {
            hook.on_device_registered(&device);
        }
    }

    pub fn register_all(&self, devices: impl IntoIterator<Item = DetectedDevice>) {
        for device in devices {
            self.register(device);
        }
    }

    pub fn get(&self, id: &str) -> Option<DetectedDevice> {
        self.devices
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    pub fn has(&self, id: &str) -> bool {
        self.devices
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(id)
    }

    pub fn all(&self) -> Vec<DetectedDevice> {
        self.query(&DeviceQuery::default())
    }

    /// Devices matching `query`, ordered by id
    pub fn query(&self, query: &DeviceQuery) -> Vec<DetectedDevice> {
        self.devices
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|d| query.matches(d))
            .cloned()
            .collect()
    }

    pub fn by_category(&self, category: DeviceCategory) -> Vec<DetectedDevice> {
        self.query(&DeviceQuery::new().category(category))
    }

    pub fn by_connection(&self, connection: ConnectionType) -> Vec<DetectedDevice> {
        self.query(&DeviceQuery::new().connection(connection))
    }

    pub fn compatible_with(&self, tool: &str) -> Vec<DetectedDevice> {
        self.query(&DeviceQuery::new().compatible_with(tool))
    }

    /// Whether at least one connected device of `category` is known
    pub fn has_connected(&self, category: DeviceCategory) -> bool {
        !self
            .query(
                &DeviceQuery::new()
                    .category(category)
                    .status(DeviceStatus::Connected),
            )
            .is_empty()
    }

    pub fn stats(&self) -> DeviceStats {
        let devices = self.devices.read().unwrap_or_else(|e| e.into_inner());
        DeviceStats::from_devices(devices.values())
    }

    /// Set a device's status and refresh `last_seen`; false if unknown
    pub fn update_status(&self, id: &str, status: DeviceStatus) -> bool {
        let previous = {
            let mut devices = self.devices.write().unwrap_or_else(|e| e.into_inner());
            let Some(device) = devices.get_mut(id) else {
                return false;
            };
            let previous = device.status;
            device.touch(status);
            previous
        };

        if previous != status {
            tracing::debug!(device = %id, from = %previous, to = %status, "Device status changed");
            for hook in self.hooks() {
                hook.on_status_changed(id, previous, status);
            }
        }
        true
    }

    pub fn mark_connected(&self, id: &str) -> bool {
        self.update_status(id, DeviceStatus::Connected)
    }

    pub fn mark_disconnected(&self, id: &str) -> bool {
        self.update_status(id, DeviceStatus::Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argos_domain::hardware::entities::DeviceCapabilities;
    use std::sync::Mutex;

    fn device(id: &str, category: DeviceCategory) -> DetectedDevice {
        DetectedDevice::new(id, id, category, ConnectionType::Usb, DeviceCapabilities::generic())
    }

    #[derive(Default)]
    struct StatusLog(Mutex<Vec<String>>);

    impl HardwareHook for StatusLog {
        fn on_status_changed(&self, id: &str, previous: DeviceStatus, current: DeviceStatus) {
            self.0
                .lock()
                .unwrap()
                .push(format!("{}:{}->{}", id, previous, current));
        }
    }

    #[test]
    fn test_register_last_wins_but_keeps_first_seen() {
        let registry = HardwareRegistry::new();
        let first = device("hackrf-1", DeviceCategory::Sdr);
        let first_seen = first.first_seen;
        registry.register(first);

        let mut second = device("hackrf-1", DeviceCategory::Sdr).with_firmware("2024.02.1");
        second.first_seen = first_seen + chrono::Duration::seconds(60);
        registry.register(second);

        let stored = registry.get("hackrf-1").unwrap();
        assert_eq!(stored.firmware_version.as_deref(), Some("2024.02.1"));
        assert_eq!(stored.first_seen, first_seen);
        assert_eq!(registry.all().len(), 1);
    }

    #[test]
    fn test_queries() {
        let registry = HardwareRegistry::new();
        registry.register(device("hackrf-1", DeviceCategory::Sdr).with_compatible_tools(["spectrum.sweep"]));
        registry.register(device("wifi-wlan1", DeviceCategory::Wifi));
        registry.register(
            DetectedDevice::new(
                "gps-gpsd",
                "gpsd",
                DeviceCategory::Gps,
                ConnectionType::Virtual,
                DeviceCapabilities::generic(),
            ),
        );

        assert_eq!(registry.by_category(DeviceCategory::Sdr).len(), 1);
        assert_eq!(registry.by_connection(ConnectionType::Virtual).len(), 1);
        assert_eq!(registry.compatible_with("spectrum.sweep")[0].id, "hackrf-1");
        assert!(registry.has_connected(DeviceCategory::Wifi));
        assert!(!registry.has_connected(DeviceCategory::Cellular));
    }

    #[test]
    fn test_status_updates_notify_hooks() {
        let registry = HardwareRegistry::new();
        let log = Arc::new(StatusLog::default());
        registry.add_hook(log.clone());
        registry.register(device("wifi-wlan1", DeviceCategory::Wifi));

        assert!(registry.mark_disconnected("wifi-wlan1"));
        assert!(registry.mark_disconnected("wifi-wlan1"));
        assert!(registry.mark_connected("wifi-wlan1"));
        assert!(!registry.mark_connected("wifi-wlan9"));

        assert!(registry.has("wifi-wlan1"));
        assert_eq!(
            *log.0.lock().unwrap(),
            vec![
                "wifi-wlan1:connected->disconnected",
                "wifi-wlan1:disconnected->connected"
            ]
        );
        assert!(!registry.has_connected(DeviceCategory::Sdr));
        assert!(!registry.stats().by_status.contains_key(&DeviceStatus::Disconnected));
    }
}
