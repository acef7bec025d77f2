//! Domain error types

use thiserror::Error;

/// Domain-level errors
///
/// Raised when an entity fails its own invariants, most notably when a
/// [`ToolDefinition`](crate::tool::entities::ToolDefinition) is rejected at
/// registration time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Tool must have a name")]
    MissingToolName,

    #[error("Tool {0} must have a namespace")]
    MissingNamespace(String),

    #[error(
        "Tool {tool} has invalid namespace format: {namespace}. Use lowercase with dots (e.g., \"device.wifi\")"
    )]
    InvalidNamespace { tool: String, namespace: String },

    #[error("Tool {tool} uses the {transport} transport but has no {field} configured")]
    IncompleteTransport {
        tool: String,
        transport: String,
        field: String,
    },

    #[error("Unknown scarce device: {0}")]
    UnknownDevice(String),
}

impl DomainError {
    /// Check if this error was caused by a malformed tool definition
    pub fn is_tool_definition_error(&self) -> bool {
        !matches!(self, DomainError::UnknownDevice(_))
    }
}
