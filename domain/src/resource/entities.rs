//! Scarce devices, their ownership state and arbitration outcomes

use crate::core::error::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Physical devices that are exclusively owned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScarceDevice {
    Hackrf,
    Alfa,
    Bluetooth,
}

impl ScarceDevice {
    pub const ALL: [ScarceDevice; 3] = [ScarceDevice::Hackrf, ScarceDevice::Alfa, ScarceDevice::Bluetooth];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScarceDevice::Hackrf => "hackrf",
            ScarceDevice::Alfa => "alfa",
            ScarceDevice::Bluetooth => "bluetooth",
        }
    }
}

impl fmt::Display for ScarceDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScarceDevice {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hackrf" => Ok(ScarceDevice::Hackrf),
            "alfa" => Ok(ScarceDevice::Alfa),
            "bluetooth" => Ok(ScarceDevice::Bluetooth),
            other => Err(DomainError::UnknownDevice(other.to_string())),
        }
    }
}

/// Ownership record for one scarce device
///
/// `owner.is_some()` if and only if `!is_available`. Every mutation goes
/// through the methods below so that the pair never drifts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceState {
    pub device: ScarceDevice,
    pub is_available: bool,
    pub owner: Option<String>,
    pub connected_since: Option<DateTime<Utc>>,
    pub is_detected: bool,
}

impl ResourceState {
    /// A free, undetected device
    pub fn vacant(device: ScarceDevice) -> Self {
        Self {
            device,
            is_available: true,
            owner: None,
            connected_since: None,
            is_detected: false,
        }
    }

    /// Record `owner` as the holder starting now
    pub fn claim(&mut self, owner: impl Into<String>) {
        self.owner = Some(owner.into());
        self.is_available = false;
        self.connected_since = Some(Utc::now());
    }

    /// Clear ownership, returning the previous owner
    pub fn vacate(&mut self) -> Option<String> {
        self.is_available = true;
        self.connected_since = None;
        self.owner.take()
    }

    /// Attribute the device to a holder found outside the manager
    ///
    /// Keeps `connected_since` when the device was already owned so the age of
    /// the ownership survives repeated reconciliation.
    pub fn adopt(&mut self, owner: impl Into<String>) {
        self.owner = Some(owner.into());
        self.is_available = false;
        if self.connected_since.is_none() {
            self.connected_since = Some(Utc::now());
        }
    }

    pub fn is_owned_by(&self, label: &str) -> bool {
        self.owner.as_deref() == Some(label)
    }
}

/// Result of an acquire attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AcquireOutcome {
    Granted,
    /// Someone else holds the device
    Held { owner: String },
    /// The per-device lock could not be taken within the bounded wait
    Contended,
    UnknownDevice,
}

impl AcquireOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, AcquireOutcome::Granted)
    }

    /// The label reported back to a caller that was not granted the device
    pub fn current_owner(&self) -> Option<&str> {
        match self {
            AcquireOutcome::Granted => None,
            AcquireOutcome::Held { owner } => Some(owner),
            AcquireOutcome::Contended => Some("mutex-timeout"),
            AcquireOutcome::UnknownDevice => Some("device-not-found"),
        }
    }
}

/// Result of a release attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReleaseOutcome {
    Released,
    NotOwner { current_owner: Option<String> },
    Contended,
}

impl ReleaseOutcome {
    pub fn is_released(&self) -> bool {
        matches!(self, ReleaseOutcome::Released)
    }

    pub fn error_message(&self) -> Option<String> {
        match self {
            ReleaseOutcome::Released => None,
            ReleaseOutcome::NotOwner { current_owner } => Some(format!(
                "Not owner. Current owner: {}",
                current_owner.as_deref().unwrap_or("none")
            )),
            ReleaseOutcome::Contended => Some("Resource busy, try again".to_string()),
        }
    }
}

/// Result of a forced reclaim
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForceReleaseOutcome {
    pub previous_owner: Option<String>,
    pub killed_processes: Vec<String>,
    pub stopped_containers: Vec<String>,
}

/// Lifecycle notifications published by the arbitration manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ResourceEvent {
    Acquired {
        device: ScarceDevice,
        owner: String,
    },
    Released {
        device: ScarceDevice,
        owner: String,
    },
    ForceReleased {
        device: ScarceDevice,
        previous_owner: Option<String>,
    },
    /// Ownership changed because of a holder found (or lost) outside the manager
    OwnershipReconciled {
        device: ScarceDevice,
        owner: Option<String>,
    },
    DetectionChanged {
        device: ScarceDevice,
        detected: bool,
    },
}

impl ResourceEvent {
    pub fn device(&self) -> ScarceDevice {
        match self {
            ResourceEvent::Acquired { device, .. }
            | ResourceEvent::Released { device, .. }
            | ResourceEvent::ForceReleased { device, .. }
            | ResourceEvent::OwnershipReconciled { device, .. }
            | ResourceEvent::DetectionChanged { device, .. } => *device,
        }
    }
}
