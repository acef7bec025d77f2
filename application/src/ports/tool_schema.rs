//! Tool schema conversion port.
//!
//! Separates "which tools to offer" (registry queries) from "how to
//! serialize them for a model API" (infrastructure).

use argos_domain::tool::entities::ToolDefinition;

/// Port for converting tool definitions to a JSON Schema tool list.
pub trait ToolSchemaPort: Send + Sync {
    /// Convert a single tool definition to
    /// `{name, description, input_schema: {type, properties, required}}`.
    fn tool_to_schema(&self, tool: &ToolDefinition) -> serde_json::Value;

    /// Convert several tools, sorted by name.
    fn tools_schema(&self, tools: &[&ToolDefinition]) -> Vec<serde_json::Value> {
        let mut tools = tools.to_vec();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools.into_iter().map(|t| self.tool_to_schema(t)).collect()
    }
}
