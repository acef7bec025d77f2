//! Hardware domain
//!
//! Devices found by probing the host: radios, wireless adapters, GPS
//! receivers, modems and networked services. A [`DetectedDevice`] is produced
//! by a probe run and is never deleted, only marked disconnected when a later
//! scan no longer sees it.
//!
//! | Category | Typical id | Capabilities |
//! |----------|------------|--------------|
//! | `sdr` | `hackrf-<serial>` | frequency range, sample rate, tx/rx |
//! | `wifi` | `wifi-<iface>` | monitor mode, injection, bands |
//! | `bluetooth` | `bluetooth-<hci>` | BLE / classic |
//! | `gps` | `gps-<dev>` | protocol, baud rate |
//! | `cellular` | `cellular-<n>` | bands, IMEI |
//!
//! [`DetectedDevice`]: entities::DetectedDevice

pub mod entities;
pub mod query;
