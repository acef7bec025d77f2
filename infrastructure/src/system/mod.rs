//! Host integration for the resource manager

pub mod presence;
pub mod process_control;

pub use presence::SystemDevicePresence;
pub use process_control::SystemProcessControl;
