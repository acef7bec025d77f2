//! Application-level configuration.
//!
//! Plain data controlling how the use cases behave:
//!
//! - [`ResourceConfig`]: arbitration timing and per-device holder profiles
//! - [`MonitorConfig`]: periodic hardware scanning
//! - [`ExecutorConfig`]: tool execution defaults

pub mod resource;
pub mod runtime;

pub use resource::ResourceConfig;
pub use runtime::{ExecutorConfig, MonitorConfig};
