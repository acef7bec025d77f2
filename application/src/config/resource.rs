//! Resource arbitration parameters.

use argos_domain::resource::{entities::ScarceDevice, profile::DeviceProfile};
use std::collections::BTreeMap;
use std::time::Duration;

/// Arbitration timing and the devices under management.
///
/// | Field | Default | Used by |
/// |-------|---------|---------|
/// | `acquire_timeout` | 5s | acquire / release lock wait |
/// | `refresh_interval` | 30s | periodic reconciliation |
/// | `ownership_grace` | 30s | refresh clearing holder-less owners |
/// | `kill_settle` | 2s | force release after killing processes |
/// | `container_settle` | 3s | force release after stopping containers |
#[derive(Debug, Clone)]
pub struct ResourceConfig {
    pub acquire_timeout: Duration,
    pub refresh_interval: Duration,
    pub ownership_grace: Duration,
    pub kill_settle: Duration,
    pub container_settle: Duration,
    /// Managed devices and the holders known for each
    pub profiles: BTreeMap<ScarceDevice, DeviceProfile>,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            acquire_timeout: Duration::from_secs(5),
            refresh_interval: Duration::from_secs(30),
            ownership_grace: Duration::from_secs(30),
            kill_settle: Duration::from_secs(2),
            container_settle: Duration::from_secs(3),
            profiles: ScarceDevice::ALL
                .into_iter()
                .map(|d| (d, DeviceProfile::default_for(d)))
                .collect(),
        }
    }
}

impl ResourceConfig {
    // ==================== Builder Methods ====================

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_ownership_grace(mut self, grace: Duration) -> Self {
        self.ownership_grace = grace;
        self
    }

    /// Set both force-release settle delays
    pub fn with_settle_delays(mut self, kill: Duration, container: Duration) -> Self {
        self.kill_settle = kill;
        self.container_settle = container;
        self
    }

    pub fn with_profile(mut self, device: ScarceDevice, profile: DeviceProfile) -> Self {
        self.profiles.insert(device, profile);
        self
    }

    /// Restrict management to the given devices
    pub fn with_devices(mut self, devices: &[ScarceDevice]) -> Self {
        self.profiles.retain(|d, _| devices.contains(d));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manages_every_device() {
        let config = ResourceConfig::default();
        assert_eq!(config.profiles.len(), ScarceDevice::ALL.len());
        assert_eq!(config.acquire_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_with_devices_restricts() {
        let config = ResourceConfig::default().with_devices(&[ScarceDevice::Alfa]);
        assert_eq!(config.profiles.keys().copied().collect::<Vec<_>>(), vec![ScarceDevice::Alfa]);
    }
}
