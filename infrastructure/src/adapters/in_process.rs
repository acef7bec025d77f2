//! In-process backend: tools implemented as async functions in this binary
//!
//! Handlers are looked up by the `handler` name in the tool's transport
//! config. A handler's `Err(String)` becomes an `error` result.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use argos_application::ports::tool_backend::{AdapterError, ToolBackendAdapter};
use argos_domain::tool::{
    entities::{ExecutionContext, Parameters, ToolDefinition, TransportConfig, TransportType},
    value_objects::ToolExecutionResult,
};
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, info};

use super::{DEFAULT_TIMEOUT_MS, timeout_for};

pub type HandlerResult = Result<Value, String>;

/// A registered handler
pub type InProcessHandler =
    Arc<dyn Fn(Parameters, Option<ExecutionContext>) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

pub struct InProcessAdapter {
    handlers: RwLock<BTreeMap<String, InProcessHandler>>,
    initialized: AtomicBool,
    default_timeout_ms: u64,
}

impl InProcessAdapter {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(BTreeMap::new()),
            initialized: AtomicBool::new(false),
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_default_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.default_timeout_ms = timeout_ms;
        self
    }

    /// Register (or replace) a handler under `name`
    pub fn register_handler<F, Fut>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(Parameters, Option<ExecutionContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let name = name.into();
        let handler: InProcessHandler = Arc::new(move |params, context| Box::pin(handler(params, context)));
        debug!(handler = %name, "Registered in-process handler");
        self.handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name, handler);
    }

    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(name)
    }

    pub fn handler_names(&self) -> Vec<String> {
        self.handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    fn handler(&self, name: &str) -> Option<InProcessHandler> {
        self.handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    async fn call(
        &self,
        tool: &ToolDefinition,
        handler_name: &str,
        params: &Parameters,
        context: Option<&ExecutionContext>,
    ) -> ToolExecutionResult {
        let Some(handler) = self.handler(handler_name) else {
            return ToolExecutionResult::error(
                &tool.name,
                TransportType::InProcess,
                format!("Handler not found: {}", handler_name),
            );
        };

        let timeout = timeout_for(None, self.default_timeout_ms);
        match tokio::time::timeout(timeout, handler(params.clone(), context.cloned())).await {
            Ok(Ok(data)) => ToolExecutionResult::success(&tool.name, TransportType::InProcess, data),
            Ok(Err(message)) => ToolExecutionResult::error(&tool.name, TransportType::InProcess, message),
            Err(_) => ToolExecutionResult::timeout(
                &tool.name,
                TransportType::InProcess,
                format!("Handler {} timed out after {}ms", handler_name, timeout.as_millis()),
            ),
        }
    }
}

impl Default for InProcessAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolBackendAdapter for InProcessAdapter {
    fn transport(&self) -> TransportType {
        TransportType::InProcess
    }

    async fn initialize(&self) -> Result<(), AdapterError> {
        info!(handlers = self.handler_names().len(), "In-process adapter ready");
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn execute(
        &self,
        tool: &ToolDefinition,
        params: &Parameters,
        context: Option<&ExecutionContext>,
    ) -> ToolExecutionResult {
        let started = Instant::now();
        let result = match &tool.transport {
            TransportConfig::InProcess(config) => self.call(tool, &config.handler, params, context).await,
            other => ToolExecutionResult::error(
                &tool.name,
                TransportType::InProcess,
                format!("Tool {} is not an in-process tool ({})", tool.name, other.transport_type()),
            ),
        };
        result.with_duration(started.elapsed())
    }

    async fn health_check(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    async fn cleanup(&self) -> Result<(), AdapterError> {
        self.initialized.store(false, Ordering::SeqCst);
        Ok(())
    }
}
