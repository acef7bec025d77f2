//! Infrastructure layer for argos
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer: tool backends, hardware probes, host process control,
//! configuration file loading and the execution audit log.

pub mod adapters;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod probes;
pub mod schema;
pub mod system;

// Re-export commonly used types
pub use adapters::{
    HttpAdapter, InProcessAdapter, InProcessHandler, ProcessAdapter, ProtocolAdapter, SocketAdapter,
    builtin_tools, register_builtin_handlers,
};
pub use catalog::{Catalog, SkipReason, build_catalog};
pub use config::{ConfigLoader, ConfigValidationError, FileConfig};
pub use logging::{JsonlExecutionLogger, spawn_resource_audit};
pub use probes::{NetworkProbe, SerialProbe, UsbProbe, default_probes};
pub use schema::JsonSchemaToolConverter;
pub use system::{SystemDevicePresence, SystemProcessControl};
