//! Application layer for argos
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.
//!
//! | Module | Use case |
//! |--------|----------|
//! | [`resource`] | exclusive ownership of scarce devices |
//! | [`hardware`] | device discovery, registry and periodic scanning |
//! | [`tools`] | tool registry, router and executor |

pub mod config;
pub mod hardware;
pub mod ports;
pub mod resource;
pub mod tools;

// Re-export commonly used types
pub use config::{ExecutorConfig, MonitorConfig, ResourceConfig};
pub use hardware::{
    monitor::HardwareMonitor,
    registry::{HardwareHook, HardwareRegistry},
    scanner::{HardwareScanner, ScanReport},
};
pub use ports::{
    device_presence::DevicePresence,
    execution_logger::{ExecutionEvent, ExecutionLogger, NoExecutionLogger},
    hardware_probe::HardwareProbe,
    process_control::{ProcessControl, ProcessInfo, SystemError},
    tool_backend::{AdapterError, ToolBackendAdapter},
    tool_schema::ToolSchemaPort,
};
pub use resource::manager::ResourceManager;
pub use tools::{
    executor::{ExecutorStats, ToolExecutor, format_batch_results_for_llm, format_result_for_llm},
    registry::{RegistryHook, RegistryStats, ToolRegistry},
    router::{RouterStats, ToolRouter},
};
