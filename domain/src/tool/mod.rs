//! Tool domain module
//!
//! A **tool** is any callable capability reachable through one uniform call
//! contract: a native binary, an HTTP endpoint, a long-lived socket stream,
//! an out-of-process protocol server or a function inside this process.
//!
//! ```text
//! ┌────────────────┐    ┌──────────────┐    ┌─────────────────────┐
//! │ ToolDefinition │───▶│ ToolRequest  │───▶│ ToolExecutionResult │
//! │ (registry)     │    │ (invocation) │    │ (always populated)  │
//! └───────┬────────┘    └──────────────┘    └─────────────────────┘
//!         │
//!         └─ transport: TransportConfig (tagged by transport type)
//! ```
//!
//! # Transports
//!
//! | Transport | Config | Placeholders |
//! |-----------|--------|--------------|
//! | `process` | command, args, cwd, env, timeout | `{{name}}` in args |
//! | `http` | base URL, method, path, headers, auth | `{name}` in path |
//! | `socket` | address, request format | none |
//! | `protocol` | server id, launch command, remote tool | none |
//! | `internal` | handler name | none |
//!
//! # Key Types
//!
//! - [`ToolDefinition`](entities::ToolDefinition): schema plus transport of a single tool
//! - [`ToolQuery`](entities::ToolQuery): AND-combined registry filter
//! - [`ToolExecutionResult`](value_objects::ToolExecutionResult): outcome of every call
//! - [`ToolValidator`](traits::ToolValidator): pure parameter validation
//!
//! Everything here is pure data and pure logic. Dispatch lives in the
//! application layer, transports in infrastructure.

pub mod entities;
pub mod template;
pub mod traits;
pub mod value_objects;
