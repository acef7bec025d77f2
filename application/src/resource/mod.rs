//! Resource arbitration
//!
//! Exclusive ownership of scarce devices, reconciled against processes and
//! containers that hold a device outside of this process's control.

pub mod manager;
