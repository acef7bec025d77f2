//! Device queries and aggregate statistics

use super::entities::{ConnectionType, DetectedDevice, DeviceCategory, DeviceStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Filter over detected devices
///
/// Every field is optional; set fields are AND-combined.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceQuery {
    pub category: Option<DeviceCategory>,
    pub connection: Option<ConnectionType>,
    pub status: Option<DeviceStatus>,
    pub compatible_tool: Option<String>,
    /// Free text over name, manufacturer, model and id
    pub search: Option<String>,
}

impl DeviceQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: DeviceCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn connection(mut self, connection: ConnectionType) -> Self {
        self.connection = Some(connection);
        self
    }

    pub fn status(mut self, status: DeviceStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn compatible_with(mut self, tool: impl Into<String>) -> Self {
        self.compatible_tool = Some(tool.into());
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn matches(&self, device: &DetectedDevice) -> bool {
        if let Some(category) = self.category
            && device.category != category
        {
            return false;
        }
        if let Some(connection) = self.connection
            && device.connection != connection
        {
            return false;
        }
        if let Some(status) = self.status
            && device.status != status
        {
            return false;
        }
        if let Some(tool) = &self.compatible_tool
            && !device.supports_tool(tool)
        {
            return false;
        }
        if let Some(text) = &self.search
            && !device.matches_text(text)
        {
            return false;
        }
        true
    }
}

/// Aggregate counts over the hardware registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStats {
    pub total: usize,
    pub connected: usize,
    pub by_category: BTreeMap<DeviceCategory, usize>,
    pub by_connection: BTreeMap<ConnectionType, usize>,
    pub by_status: BTreeMap<DeviceStatus, usize>,
}

impl DeviceStats {
    pub fn from_devices<'a>(devices: impl IntoIterator<Item = &'a DetectedDevice>) -> Self {
        let mut stats = DeviceStats::default();
        for device in devices {
            stats.total += 1;
            if device.is_connected() {
                stats.connected += 1;
            }
            *stats.by_category.entry(device.category).or_insert(0) += 1;
            *stats.by_connection.entry(device.connection).or_insert(0) += 1;
            *stats.by_status.entry(device.status).or_insert(0) += 1;
        }
        stats
    }
}
