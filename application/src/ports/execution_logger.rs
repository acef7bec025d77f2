//! Port for structured execution logging.
//!
//! Defines the [`ExecutionLogger`] trait for recording tool executions and
//! resource ownership changes to a structured audit log.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostics, while this port captures a machine-readable
//! record (JSONL) of what ran and who held which device.

use serde_json::Value;

/// A structured audit event.
///
/// Each event has a type string and a JSON payload; the logger adds the
/// timestamp when the record is written.
pub struct ExecutionEvent {
    /// Event type identifier (e.g., "tool_execution", "resource_event").
    pub event_type: &'static str,
    pub payload: Value,
}

impl ExecutionEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for logging execution events.
///
/// `log` is synchronous and non-fallible so that auditing never disturbs a
/// tool call; write failures are dropped by the implementation.
pub trait ExecutionLogger: Send + Sync {
    fn log(&self, event: ExecutionEvent);
}

/// No-op implementation for tests and when auditing is disabled.
pub struct NoExecutionLogger;

impl ExecutionLogger for NoExecutionLogger {
    fn log(&self, _event: ExecutionEvent) {}
}
