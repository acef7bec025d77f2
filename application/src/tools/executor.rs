//! Tool Executor
//!
//! The public entry point of the runtime. Callers (an agent loop, an API
//! layer, the CLI) go through [`ToolExecutor`] and never touch the router
//! or adapters directly.
//!
//! | Operation | Behaviour |
//! |-----------|-----------|
//! | [`execute`](ToolExecutor::execute) | one call through the router |
//! | [`execute_batch`](ToolExecutor::execute_batch) | concurrent, results in input order |
//! | [`execute_sequence`](ToolExecutor::execute_sequence) | in order, stops after the first `error` |
//! | [`available_tools`](ToolExecutor::available_tools) | tools offered in the context's workflow |

use std::collections::BTreeMap;
use std::sync::Arc;

use argos_domain::tool::{
    entities::{ExecutionContext, Parameters, ToolDefinition, ToolQuery, ToolRequest, TransportType},
    value_objects::{ExecutionStatus, ToolExecutionResult},
};
use futures::future::join_all;
use serde::Serialize;
use serde_json::json;

use super::registry::{RegistryStats, ToolRegistry};
use super::router::{RouterStats, ToolRouter};
use crate::config::ExecutorConfig;
use crate::ports::execution_logger::{ExecutionEvent, ExecutionLogger, NoExecutionLogger};
use crate::ports::tool_backend::AdapterError;
use crate::ports::tool_schema::ToolSchemaPort;

#[derive(Debug, Clone, Serialize)]
pub struct ExecutorStats {
    pub registry: RegistryStats,
    pub router: RouterStats,
}

pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    router: Arc<ToolRouter>,
    schema: Arc<dyn ToolSchemaPort>,
    logger: Arc<dyn ExecutionLogger>,
    config: ExecutorConfig,
}

impl ToolExecutor {
    pub fn new(router: Arc<ToolRouter>, schema: Arc<dyn ToolSchemaPort>) -> Self {
        Self {
            registry: Arc::clone(router.registry()),
            router,
            schema,
            logger: Arc::new(NoExecutionLogger),
            config: ExecutorConfig::default(),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn ExecutionLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    // ==================== Execution ====================

    /// Execute one tool by name
    pub async fn execute(
        &self,
        name: &str,
        params: Parameters,
        context: Option<&ExecutionContext>,
    ) -> ToolExecutionResult {
        self.execute_request(&ToolRequest::new(name).with_params(params), context)
            .await
    }

    pub async fn execute_request(
        &self,
        request: &ToolRequest,
        context: Option<&ExecutionContext>,
    ) -> ToolExecutionResult {
        let result = self.router.route(request, context).await;

        tracing::debug!(
            tool = %result.tool_name,
            status = %result.status,
            duration_ms = result.duration,
            backend = %result.backend,
            "Tool execution finished"
        );
        self.logger.log(ExecutionEvent::new(
            "tool_execution",
            json!({
                "tool": result.tool_name,
                "status": result.status,
                "backend": result.backend,
                "duration_ms": result.duration,
                "error": result.error,
                "workflow": context.and_then(|c| c.workflow.clone()),
            }),
        ));
        result
    }

    /// Run all requests concurrently; results follow input order
    pub async fn execute_batch(
        &self,
        requests: &[ToolRequest],
        context: Option<&ExecutionContext>,
    ) -> Vec<ToolExecutionResult> {
        join_all(requests.iter().map(|r| self.execute_request(r, context))).await
    }

    /// Run requests in order, stopping after the first `error` result
    pub async fn execute_sequence(
        &self,
        requests: &[ToolRequest],
        context: Option<&ExecutionContext>,
    ) -> Vec<ToolExecutionResult> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            let result = self.execute_request(request, context).await;
            let failed = result.status == ExecutionStatus::Error;
            results.push(result);
            if failed {
                tracing::debug!(tool = %request.tool, "Sequence stopped on error");
                break;
            }
        }
        results
    }

    // ==================== Discovery ====================

    /// Tools offered in the context's workflow, or every tool without one
    pub fn available_tools(&self, context: Option<&ExecutionContext>) -> Vec<Arc<ToolDefinition>> {
        match context.and_then(|c| c.workflow.as_deref()) {
            Some(workflow) => self.registry.workflow_tools(workflow),
            None => self.registry.all(),
        }
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.registry.has(name)
    }

    pub fn get_tool(&self, name: &str) -> Option<Arc<ToolDefinition>> {
        self.registry.get(name)
    }

    pub fn namespace_tools(&self, namespace: &str) -> Vec<Arc<ToolDefinition>> {
        self.registry.namespace_tools(namespace)
    }

    /// Tools whose name, description or tags mention `text`
    pub fn suggest_tools(
        &self,
        text: &str,
        context: Option<&ExecutionContext>,
    ) -> Vec<Arc<ToolDefinition>> {
        let mut query = ToolQuery::new().search(text);
        if let Some(workflow) = context.and_then(|c| c.workflow.as_deref()) {
            query = query.workflow(workflow);
        }
        let mut tools = self.registry.query(&query);
        tools.truncate(self.config.suggestion_limit);
        tools
    }

    /// Tool schemas for a model API, limited to the context's workflow
    pub fn generate_tool_schemas(&self, context: Option<&ExecutionContext>) -> Vec<serde_json::Value> {
        let tools = self.available_tools(context);
        let refs: Vec<&ToolDefinition> = tools.iter().map(|t| t.as_ref()).collect();
        self.schema.tools_schema(&refs)
    }

    // ==================== Lifecycle ====================

    pub async fn initialize(&self) -> Vec<AdapterError> {
        tracing::info!(tools = self.registry.count(), "Initializing tool executor");
        self.router.initialize_all().await
    }

    pub async fn health_check(&self) -> BTreeMap<TransportType, bool> {
        self.router.health_check_all().await
    }

    pub async fn cleanup(&self) -> Vec<AdapterError> {
        self.router.cleanup_all().await
    }

    pub fn stats(&self) -> ExecutorStats {
        ExecutorStats {
            registry: self.registry.stats(),
            router: self.router.stats(),
        }
    }
}

// ==================== LLM Formatting ====================

/// Render a result as plain text for a language model
pub fn format_result_for_llm(result: &ToolExecutionResult) -> String {
    if result.is_success() {
        let data = result
            .data
            .as_ref()
            .map(|d| serde_json::to_string_pretty(d).unwrap_or_else(|_| d.to_string()))
            .unwrap_or_else(|| "null".to_string());
        format!(
            "Tool: {}\nStatus: Success\nDuration: {}ms\n\nResult:\n{}",
            result.tool_name, result.duration, data
        )
    } else {
        format!(
            "Tool: {}\nStatus: {}\nError: {}\nDuration: {}ms",
            result.tool_name,
            result.status,
            result.error.as_deref().unwrap_or("unknown error"),
            result.duration
        )
    }
}

pub fn format_batch_results_for_llm(results: &[ToolExecutionResult]) -> String {
    let total = results.len();
    results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "=== Tool {}/{}: {} ===\n{}",
                i + 1,
                total,
                r.tool_name,
                format_result_for_llm(r)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
