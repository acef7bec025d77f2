//! Tool execution runtime
//!
//! ```text
//! ToolExecutor ──▶ ToolRouter ──▶ ToolBackendAdapter (one per transport)
//!      │               │
//!      └──────┬────────┘
//!             ▼
//!        ToolRegistry
//! ```
//!
//! The registry is a validated catalog, the router resolves, validates and
//! dispatches a single call, and the executor is the public entry point
//! adding batch and sequence execution plus discovery.

pub mod executor;
pub mod registry;
pub mod router;
