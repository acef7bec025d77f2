//! Domain layer for argos
//!
//! This crate contains the core entities, value objects and pure rules.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Hardware
//!
//! Devices discovered by probing the host ([`DetectedDevice`]), filtered with
//! [`DeviceQuery`] and summarised by [`DeviceStats`].
//!
//! ## Resources
//!
//! A fixed set of [`ScarceDevice`]s that only one tool may use at a time.
//! [`ResourceState`] records ownership; [`DeviceProfile`] lists the external
//! processes and containers that are known to hold each device.
//!
//! ## Tools
//!
//! A [`ToolDefinition`] binds a name and parameter schema to one of five
//! transports. Every call yields a [`ToolExecutionResult`].

pub mod core;
pub mod hardware;
pub mod resource;
pub mod tool;

// Re-export commonly used types
pub use core::error::DomainError;
pub use hardware::{
    entities::{ConnectionType, DetectedDevice, DeviceCapabilities, DeviceCategory, DeviceStatus},
    query::{DeviceQuery, DeviceStats},
};
pub use resource::{
    entities::{
        AcquireOutcome, ForceReleaseOutcome, ReleaseOutcome, ResourceEvent, ResourceState,
        ScarceDevice,
    },
    profile::{DeviceProfile, ScriptPattern},
};
pub use tool::{
    entities::{
        ExecutionContext, GeoPoint, HttpAuth, HttpConfig, HttpMethod, InProcessConfig,
        ParameterSchema, ParameterType, Parameters, ProcessConfig, ProtocolConfig, RequestFormat,
        SocketConfig, ToolDefinition, ToolQuery, ToolRequest, TransportConfig, TransportType,
    },
    traits::{DefaultToolValidator, ToolValidator},
    value_objects::{ExecutionStatus, ToolExecutionResult},
};
