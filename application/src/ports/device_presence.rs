//! Physical presence detection for scarce devices

use super::process_control::Result;
use argos_domain::resource::entities::ScarceDevice;
use async_trait::async_trait;

/// Port answering "is this device plugged in right now?"
///
/// An `Err` means the question could not be answered; callers keep their
/// previous belief instead of assuming absence.
#[async_trait]
pub trait DevicePresence: Send + Sync {
    async fn is_present(&self, device: ScarceDevice) -> Result<bool>;
}
