//! Tool domain value objects: execution outcomes
//!
//! Every call through the runtime produces exactly one
//! [`ToolExecutionResult`], whatever happened on the way: unknown tool,
//! invalid parameters, transport failure, timeout or success. Callers branch
//! on [`ExecutionStatus`] and never see a raw transport error.

use super::entities::TransportType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Terminal state of a tool call
///
/// | Status | Meaning |
/// |--------|---------|
/// | `success` | The backend ran and reported success |
/// | `error` | Validation, transport, ownership or backend failure |
/// | `timeout` | The bounded operation exceeded its deadline and was cancelled |
/// | `not_found` | No tool is registered under the requested name |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Error,
    Timeout,
    NotFound,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::Error => "error",
            ExecutionStatus::Timeout => "timeout",
            ExecutionStatus::NotFound => "not_found",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolExecutionResult {
    pub status: ExecutionStatus,
    pub tool_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Raw backend detail behind `error` (stderr, response body, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<Value>,
    /// Wall-clock duration in milliseconds
    pub duration: u64,
    pub timestamp: DateTime<Utc>,
    pub backend: TransportType,
}

impl ToolExecutionResult {
    fn build(tool_name: impl Into<String>, backend: TransportType, status: ExecutionStatus) -> Self {
        Self {
            status,
            tool_name: tool_name.into(),
            data: None,
            error: None,
            error_details: None,
            duration: 0,
            timestamp: Utc::now(),
            backend,
        }
    }

    pub fn success(tool_name: impl Into<String>, backend: TransportType, data: Value) -> Self {
        let mut result = Self::build(tool_name, backend, ExecutionStatus::Success);
        result.data = Some(data);
        result
    }

    pub fn failure(
        tool_name: impl Into<String>,
        backend: TransportType,
        status: ExecutionStatus,
        error: impl Into<String>,
    ) -> Self {
        let mut result = Self::build(tool_name, backend, status);
        result.error = Some(error.into());
        result
    }

    pub fn error(tool_name: impl Into<String>, backend: TransportType, error: impl Into<String>) -> Self {
        Self::failure(tool_name, backend, ExecutionStatus::Error, error)
    }

    pub fn timeout(tool_name: impl Into<String>, backend: TransportType, error: impl Into<String>) -> Self {
        Self::failure(tool_name, backend, ExecutionStatus::Timeout, error)
    }

    /// Unknown tool; reported against the in-process backend since no
    /// transport was ever selected
    pub fn not_found(tool_name: impl Into<String>) -> Self {
        let tool_name = tool_name.into();
        let message = format!("Tool not found: {}", tool_name);
        Self::failure(tool_name, TransportType::InProcess, ExecutionStatus::NotFound, message)
    }

    pub fn with_details(mut self, details: impl Into<Value>) -> Self {
        self.error_details = Some(details.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_result() {
        let result = ToolExecutionResult::success(
            "geo.distance",
            TransportType::InProcess,
            serde_json::json!({"distance_km": 1.0}),
        )
        .with_duration(Duration::from_millis(12));
        assert!(result.is_success());
        assert_eq!(result.duration, 12);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_not_found_result() {
        let result = ToolExecutionResult::not_found("nope");
        assert_eq!(result.status, ExecutionStatus::NotFound);
        assert_eq!(result.error.as_deref(), Some("Tool not found: nope"));
        assert_eq!(result.backend, TransportType::InProcess);
    }

    #[test]
    fn test_serialized_shape() {
        let result = ToolExecutionResult::timeout("scan", TransportType::Process, "Command timed out after 10ms")
            .with_details("partial output");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "timeout");
        assert_eq!(json["toolName"], "scan");
        assert_eq!(json["errorDetails"], "partial output");
        assert_eq!(json["backend"], "process");
        assert!(json.get("timestamp").is_some());
    }
}
