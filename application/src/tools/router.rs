//! Tool Router
//!
//! Resolves a [`ToolRequest`] to its definition, validates the parameters,
//! selects the adapter for the tool's transport and forwards the call.
//!
//! ```text
//! received ─▶ tool-resolved ─▶ parameters-validated ─▶ adapter-resolved ─▶ executing ─▶ completed
//!                 │                     │                      │
//!                 ▼                     ▼                      ▼
//!             not_found               error                  error
//! ```
//!
//! Every path ends in a fully populated [`ToolExecutionResult`]. Adapter
//! calls run on their own task so that a panicking adapter becomes an
//! `error` result instead of unwinding into the caller.
//!
//! When built with [`ToolRouter::with_resource_manager`], tools declaring
//! `requires_device` are wrapped in an acquire/release pair owned by the
//! tool's name. The pair runs on a detached task: dropping the `route`
//! future does not skip the release, which happens once the adapter returns.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use argos_domain::resource::entities::{AcquireOutcome, ScarceDevice};
use argos_domain::tool::{
    entities::{ExecutionContext, Parameters, ToolDefinition, ToolRequest, TransportType},
    traits::{DefaultToolValidator, ToolValidator},
    value_objects::ToolExecutionResult,
};
use serde::Serialize;

use crate::ports::tool_backend::{AdapterError, ToolBackendAdapter};
use crate::resource::manager::ResourceManager;

/// Statistics about the router
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouterStats {
    pub adapters: Vec<TransportType>,
    pub adapter_count: usize,
}

pub struct ToolRouter {
    registry: Arc<super::registry::ToolRegistry>,
    adapters: BTreeMap<TransportType, Arc<dyn ToolBackendAdapter>>,
    validator: Box<dyn ToolValidator>,
    resources: Option<Arc<ResourceManager>>,
}

impl ToolRouter {
    pub fn new(registry: Arc<super::registry::ToolRegistry>) -> Self {
        Self {
            registry,
            adapters: BTreeMap::new(),
            validator: Box::new(DefaultToolValidator),
            resources: None,
        }
    }

    /// Register the adapter for its transport, replacing any previous one
    pub fn with_adapter(mut self, adapter: Arc<dyn ToolBackendAdapter>) -> Self {
        self.adapters.insert(adapter.transport(), adapter);
        self
    }

    pub fn with_validator(mut self, validator: Box<dyn ToolValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Acquire `requires_device` automatically around each call
    pub fn with_resource_manager(mut self, resources: Arc<ResourceManager>) -> Self {
        self.resources = Some(resources);
        self
    }

    pub fn registry(&self) -> &Arc<super::registry::ToolRegistry> {
        &self.registry
    }

    pub fn has_adapter(&self, transport: TransportType) -> bool {
        self.adapters.contains_key(&transport)
    }

    /// Route one call through to its backend
    pub async fn route(
        &self,
        request: &ToolRequest,
        context: Option<&ExecutionContext>,
    ) -> ToolExecutionResult {
        let started = Instant::now();

        let Some(tool) = self.registry.get(&request.tool) else {
            tracing::debug!(tool = %request.tool, "Tool not found");
            return ToolExecutionResult::not_found(&request.tool).with_duration(started.elapsed());
        };

        let transport = tool.transport_type();
        if let Err(message) = self.validator.validate(&tool, &request.parameters) {
            tracing::debug!(tool = %tool.name, error = %message, "Parameter validation failed");
            return ToolExecutionResult::error(&tool.name, transport, message).with_duration(started.elapsed());
        }

        let Some(adapter) = self.adapters.get(&transport).cloned() else {
            return ToolExecutionResult::error(
                &tool.name,
                transport,
                format!("No adapter registered for transport type: {}", transport),
            )
            .with_duration(started.elapsed());
        };

        tracing::debug!(tool = %tool.name, transport = %transport, "Dispatching tool call");
        let name = tool.name.clone();
        let call = tokio::spawn(leased_call(
            adapter,
            tool,
            request.parameters.clone(),
            context.cloned(),
            self.resources.clone(),
        ));

        match call.await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "Tool call task failed");
                ToolExecutionResult::error(name, transport, format!("Adapter failure: {}", e))
                    .with_duration(started.elapsed())
            }
        }
    }

    /// Initialize every adapter; failures are logged and returned
    pub async fn initialize_all(&self) -> Vec<AdapterError> {
        let mut failures = Vec::new();
        for (transport, adapter) in &self.adapters {
            match adapter.initialize().await {
                Ok(()) => tracing::debug!(transport = %transport, "Adapter initialized"),
                Err(e) => {
                    tracing::warn!(transport = %transport, error = %e, "Adapter failed to initialize");
                    failures.push(e);
                }
            }
        }
        failures
    }

    pub async fn health_check_all(&self) -> BTreeMap<TransportType, bool> {
        let mut health = BTreeMap::new();
        for (transport, adapter) in &self.adapters {
            health.insert(*transport, adapter.health_check().await);
        }
        health
    }

    pub async fn cleanup_all(&self) -> Vec<AdapterError> {
        let mut failures = Vec::new();
        for (transport, adapter) in &self.adapters {
            if let Err(e) = adapter.cleanup().await {
                tracing::warn!(transport = %transport, error = %e, "Adapter cleanup failed");
                failures.push(e);
            }
        }
        failures
    }

    pub fn stats(&self) -> RouterStats {
        RouterStats {
            adapters: self.adapters.keys().copied().collect(),
            adapter_count: self.adapters.len(),
        }
    }
}

/// Acquire the tool's device if automatic acquisition applies
async fn acquire_device(
    resources: Option<&ResourceManager>,
    tool: &ToolDefinition,
) -> Result<Option<ScarceDevice>, String> {
    let (Some(device), Some(resources)) = (tool.requires_device, resources) else {
        return Ok(None);
    };

    match resources.acquire(&tool.name, device).await {
        AcquireOutcome::Granted => Ok(Some(device)),
        AcquireOutcome::Held { owner } => Err(format!("Device {} is in use by {}", device, owner)),
        AcquireOutcome::Contended => Err(format!("Device {} is busy", device)),
        AcquireOutcome::UnknownDevice => Err(format!("Device {} is not managed", device)),
    }
}

/// Acquire, dispatch and release as one unit that outlives the caller
async fn leased_call(
    adapter: Arc<dyn ToolBackendAdapter>,
    tool: Arc<ToolDefinition>,
    params: Parameters,
    context: Option<ExecutionContext>,
    resources: Option<Arc<ResourceManager>>,
) -> ToolExecutionResult {
    let started = Instant::now();
    let lease = match acquire_device(resources.as_deref(), &tool).await {
        Ok(lease) => lease,
        Err(message) => {
            return ToolExecutionResult::error(&tool.name, adapter.transport(), message)
                .with_duration(started.elapsed());
        }
    };

    let result = dispatch(adapter, Arc::clone(&tool), params, context).await;

    if let (Some(device), Some(resources)) = (lease, &resources) {
        let released = resources.release(&tool.name, device).await;
        if let Some(error) = released.error_message() {
            tracing::warn!(tool = %tool.name, device = %device, error = %error, "Failed to release device after call");
        }
    }

    result
}

/// Run the adapter on its own task, converting a panic into an error result
async fn dispatch(
    adapter: Arc<dyn ToolBackendAdapter>,
    tool: Arc<ToolDefinition>,
    params: Parameters,
    context: Option<ExecutionContext>,
) -> ToolExecutionResult {
    let started = Instant::now();
    let name = tool.name.clone();
    let transport = adapter.transport();

    let handle =
        tokio::spawn(async move { adapter.execute(&tool, &params, context.as_ref()).await });

    match handle.await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(tool = %name, error = %e, "Adapter task failed");
            ToolExecutionResult::error(name, transport, format!("Adapter failure: {}", e))
                .with_duration(started.elapsed())
        }
    }
}
