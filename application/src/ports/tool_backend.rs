//! Tool backend port
//!
//! One implementation per transport. The router holds them behind
//! `Arc<dyn ToolBackendAdapter>` keyed by [`TransportType`] and treats them
//! polymorphically.

use argos_domain::tool::{
    entities::{ExecutionContext, Parameters, ToolDefinition, TransportType},
    value_objects::ToolExecutionResult,
};
use async_trait::async_trait;
use thiserror::Error;

/// Failures of adapter lifecycle operations
///
/// `execute` never returns this: execution failures are reported inside the
/// [`ToolExecutionResult`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("{transport} adapter failed to initialize: {message}")]
    Initialization {
        transport: TransportType,
        message: String,
    },

    #[error("{transport} adapter cleanup failed: {message}")]
    Cleanup {
        transport: TransportType,
        message: String,
    },
}

/// Port for a single transport backend
///
/// Implementations catch every transport failure and translate it into a
/// result; `execute` must not panic or hang past the tool's timeout.
#[async_trait]
pub trait ToolBackendAdapter: Send + Sync {
    /// The transport this adapter serves
    fn transport(&self) -> TransportType;

    /// Prepare the adapter for use
    async fn initialize(&self) -> Result<(), AdapterError>;

    /// Run one call of `tool`
    async fn execute(
        &self,
        tool: &ToolDefinition,
        params: &Parameters,
        context: Option<&ExecutionContext>,
    ) -> ToolExecutionResult;

    /// Whether the adapter can currently serve calls
    async fn health_check(&self) -> bool;

    /// Release connections, child processes and other held resources
    async fn cleanup(&self) -> Result<(), AdapterError>;
}
