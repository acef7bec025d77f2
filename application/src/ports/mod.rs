//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod device_presence;
pub mod execution_logger;
pub mod hardware_probe;
pub mod process_control;
pub mod tool_backend;
pub mod tool_schema;
