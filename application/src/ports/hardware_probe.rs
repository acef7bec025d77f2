//! Hardware probe port

use argos_domain::hardware::entities::DetectedDevice;
use async_trait::async_trait;

/// A category-specific detector (USB, serial, network services, ...)
///
/// `probe` is best-effort: a missing utility or failed command yields fewer
/// devices, never an error, so one broken probe cannot abort a scan.
#[async_trait]
pub trait HardwareProbe: Send + Sync {
    fn name(&self) -> &str;

    async fn probe(&self) -> Vec<DetectedDevice>;
}
