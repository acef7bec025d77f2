//! Hardware discovery
//!
//! Probes feed a [`HardwareScanner`](scanner::HardwareScanner), which stores
//! what it finds in the [`HardwareRegistry`](registry::HardwareRegistry).
//! A [`HardwareMonitor`](monitor::HardwareMonitor) repeats the scan on an
//! interval. Whether a device is *free* is decided by the resource manager,
//! not here.

pub mod monitor;
pub mod registry;
pub mod scanner;
