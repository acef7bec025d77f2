//! Tool Registry
//!
//! The [`ToolRegistry`] is an in-memory catalog of [`ToolDefinition`]s keyed
//! by name. Definitions are validated on insert; re-registering a name
//! replaces the previous definition.
//!
//! # Usage
//!
//! ```ignore
//! let registry = ToolRegistry::new();
//! registry.add_hook(Arc::new(AuditHook));
//! registry.register(distance_tool())?;
//!
//! let geo = registry.query(&ToolQuery::new().namespace("geo"));
//! ```
//!
//! Hooks are the extension point for instrumentation: they run after the
//! catalog has been updated, in registration order.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use argos_domain::core::error::DomainError;
use argos_domain::tool::entities::{ToolDefinition, ToolQuery, TransportType};
use serde::Serialize;

/// Observer of catalog changes
pub trait RegistryHook: Send + Sync {
    fn on_tool_registered(&self, _tool: &ToolDefinition) {}

    fn on_tool_unregistered(&self, _name: &str) {}
}

/// Statistics about the registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub total_tools: usize,
    pub namespaces: usize,
    pub by_transport: BTreeMap<TransportType, usize>,
    pub by_namespace: BTreeMap<String, usize>,
}

/// Catalog of callable tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<BTreeMap<String, Arc<ToolDefinition>>>,
    hooks: RwLock<Vec<Arc<dyn RegistryHook>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an observer of registrations and removals
    pub fn add_hook(&self, hook: Arc<dyn RegistryHook>) {
        self.hooks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(hook);
    }

    fn hooks(&self) -> Vec<Arc<dyn RegistryHook>> {
        self.hooks.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Validate and insert a tool, replacing any tool with the same name
    pub fn register(&self, tool: ToolDefinition) -> Result<(), DomainError> {
        tool.validate()?;

        let tool = Arc::new(tool);
        let replaced = self
            .tools
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(tool.name.clone(), Arc::clone(&tool))
            .is_some();

        tracing::debug!(
            tool = %tool.name,
            namespace = %tool.namespace,
            transport = %tool.transport_type(),
            replaced,
            "Registered tool"
        );

        for hook in self.hooks() {
            hook.on_tool_registered(&tool);
        }
        Ok(())
    }

    /// Register several tools, stopping at the first invalid one
    pub fn register_all(
        &self,
        tools: impl IntoIterator<Item = ToolDefinition>,
    ) -> Result<usize, DomainError> {
        let mut count = 0;
        for tool in tools {
            self.register(tool)?;
            count += 1;
        }
        Ok(count)
    }

    /// Remove a tool; returns whether it existed
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self
            .tools
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(name)
            .is_some();

        if removed {
            tracing::debug!(tool = %name, "Unregistered tool");
            for hook in self.hooks() {
                hook.on_tool_unregistered(name);
            }
        }
        removed
    }

    /// Remove every tool, notifying hooks for each
    pub fn clear(&self) {
        let names: Vec<String> = {
            let mut tools = self.tools.write().unwrap_or_else(|e| e.into_inner());
            let names = tools.keys().cloned().collect();
            tools.clear();
            names
        };
        let hooks = self.hooks();
        for name in &names {
            for hook in &hooks {
                hook.on_tool_unregistered(name);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<ToolDefinition>> {
        self.tools
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(name)
    }

    /// All tools matching `query`, ordered by name
    pub fn query(&self, query: &ToolQuery) -> Vec<Arc<ToolDefinition>> {
        self.tools
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|t| query.matches(t))
            .cloned()
            .collect()
    }

    pub fn all(&self) -> Vec<Arc<ToolDefinition>> {
        self.query(&ToolQuery::default())
    }

    pub fn count(&self) -> usize {
        self.tools.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Distinct namespaces, sorted
    pub fn namespaces(&self) -> Vec<String> {
        let mut namespaces: Vec<String> = self
            .tools
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(|t| t.namespace.clone())
            .collect();
        namespaces.sort();
        namespaces.dedup();
        namespaces
    }

    pub fn namespace_tools(&self, namespace: &str) -> Vec<Arc<ToolDefinition>> {
        self.query(&ToolQuery::new().namespace(namespace))
    }

    /// Tools offered in `workflow`, including those not scoped to any workflow
    pub fn workflow_tools(&self, workflow: &str) -> Vec<Arc<ToolDefinition>> {
        self.query(&ToolQuery::new().workflow(workflow))
    }

    pub fn stats(&self) -> RegistryStats {
        let tools = self.tools.read().unwrap_or_else(|e| e.into_inner());
        let mut stats = RegistryStats {
            total_tools: tools.len(),
            ..RegistryStats::default()
        };
        for tool in tools.values() {
            *stats.by_transport.entry(tool.transport_type()).or_insert(0) += 1;
            *stats.by_namespace.entry(tool.namespace.clone()).or_insert(0) += 1;
        }
        stats.namespaces = stats.by_namespace.len();
        stats
    }
}
