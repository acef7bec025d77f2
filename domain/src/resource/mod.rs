//! Scarce-device arbitration domain
//!
//! A small fixed set of physical devices cannot be shared between tools.
//! Each has a [`ResourceState`] recording who holds it, and a
//! [`DeviceProfile`] listing the processes and containers that are known to
//! grab it outside of the arbitration manager's control.
//!
//! The state transitions themselves (acquire, release, force release,
//! reconciliation) live in the application layer; this module only holds the
//! data and the pure rules that keep `owner` and `is_available` consistent.
//!
//! [`ResourceState`]: entities::ResourceState
//! [`DeviceProfile`]: profile::DeviceProfile

pub mod entities;
pub mod profile;
