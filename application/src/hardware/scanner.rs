//! Hardware Scanner
//!
//! Runs every probe concurrently and folds the results into the registry.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use argos_domain::hardware::{
    entities::{DetectedDevice, DeviceCategory},
    query::DeviceStats,
};
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Mutex;

use super::registry::HardwareRegistry;
use crate::ports::hardware_probe::HardwareProbe;

/// Outcome of one scan
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// Devices seen in this scan, deduplicated by id
    pub devices: Vec<DetectedDevice>,
    /// Ids that were connected before and are now missing
    pub disconnected: Vec<String>,
    /// Registry totals after the scan
    pub stats: DeviceStats,
    pub duration: Duration,
}

pub struct HardwareScanner {
    probes: Vec<Arc<dyn HardwareProbe>>,
    registry: Arc<HardwareRegistry>,
    scan_lock: Mutex<()>,
}

/// Keep the last occurrence of each id, in first-seen order
fn dedup_last_wins(devices: Vec<DetectedDevice>) -> Vec<DetectedDevice> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<DetectedDevice> = Vec::new();
    for device in devices {
        match index.get(&device.id) {
            Some(&i) => unique[i] = device,
            None => {
                index.insert(device.id.clone(), unique.len());
                unique.push(device);
            }
        }
    }
    unique
}

impl HardwareScanner {
    pub fn new(registry: Arc<HardwareRegistry>) -> Self {
        Self {
            probes: Vec::new(),
            registry,
            scan_lock: Mutex::new(()),
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn HardwareProbe>) -> Self {
        self.probes.push(probe);
        self
    }

    pub fn registry(&self) -> &Arc<HardwareRegistry> {
        &self.registry
    }

    pub fn probe_names(&self) -> Vec<String> {
        self.probes.iter().map(|p| p.name().to_string()).collect()
    }

    /// Probe everything once and update the registry
    ///
    /// Concurrent callers are serialized so two scans never interleave
    /// their disconnect marking.
    pub async fn scan(&self) -> ScanReport {
        let _guard = self.scan_lock.lock().await;
        let started = Instant::now();

        let results = join_all(self.probes.iter().map(|probe| async move {
            let devices = probe.probe().await;
            tracing::debug!(probe = probe.name(), found = devices.len(), "Probe finished");
            devices
        }))
        .await;

        let devices = dedup_last_wins(results.into_iter().flatten().collect());
        let seen: BTreeSet<&str> = devices.iter().map(|d| d.id.as_str()).collect();

        let disconnected: Vec<String> = self
            .registry
            .all()
            .into_iter()
            .filter(|d| d.is_connected() && !seen.contains(d.id.as_str()))
            .map(|d| d.id)
            .collect();

        self.registry.register_all(devices.iter().cloned());
        for id in &disconnected {
            self.registry.mark_disconnected(id);
        }

        let report = ScanReport {
            devices,
            disconnected,
            stats: self.registry.stats(),
            duration: started.elapsed(),
        };
        tracing::info!(
            found = report.devices.len(),
            disconnected = report.disconnected.len(),
            duration_ms = report.duration.as_millis() as u64,
            "Hardware scan complete"
        );
        report
    }

    /// Look a device up, rescanning once if it is not known yet
    pub async fn find(&self, id: &str) -> Option<DetectedDevice> {
        if let Some(device) = self.registry.get(id) {
            return Some(device);
        }
        self.scan().await;
        self.registry.get(id)
    }

    pub async fn is_device_available(&self, id: &str) -> bool {
        self.find(id).await.is_some_and(|d| d.is_connected())
    }

    /// Whether a connected device of `category` exists, rescanning on a miss
    pub async fn is_category_available(&self, category: DeviceCategory) -> bool {
        if self.registry.has_connected(category) {
            return true;
        }
        self.scan().await;
        self.registry.has_connected(category)
    }
}
