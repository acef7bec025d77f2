//! JSON Schema tool converter.
//!
//! Default implementation of [`ToolSchemaPort`] producing provider-neutral
//! JSON Schema for LLM tool-use APIs.

use argos_application::ports::tool_schema::ToolSchemaPort;
use argos_domain::tool::entities::ToolDefinition;
use serde_json::{Map, Value, json};

/// Default implementation producing provider-neutral JSON Schema.
///
/// Each parameter becomes a property with its `type` and `description`;
/// `enum` and `default` are carried over when the definition has them.
/// `required` keeps the definition's order.
pub struct JsonSchemaToolConverter;

impl ToolSchemaPort for JsonSchemaToolConverter {
    fn tool_to_schema(&self, tool: &ToolDefinition) -> Value {
        let mut properties = Map::new();

        for (name, param) in &tool.parameters {
            let mut prop = Map::new();
            prop.insert("type".to_string(), json!(param.param_type.as_str()));
            prop.insert("description".to_string(), json!(param.description));
            if let Some(allowed) = &param.allowed {
                prop.insert("enum".to_string(), json!(allowed));
            }
            if let Some(default) = &param.default {
                prop.insert("default".to_string(), default.clone());
            }
            properties.insert(name.clone(), Value::Object(prop));
        }

        json!({
            "name": tool.name,
            "description": tool.description,
            "input_schema": {
                "type": "object",
                "properties": properties,
                "required": tool.required,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argos_domain::tool::entities::{ParameterSchema, ProcessConfig, TransportConfig};

    fn sweep() -> ToolDefinition {
        ToolDefinition::new(
            "spectrum.sweep",
            "spectrum",
            "Sweep a frequency range",
            TransportConfig::Process(ProcessConfig {
                command: "hackrf_sweep".to_string(),
                ..ProcessConfig::default()
            }),
        )
        .with_required("start_mhz", ParameterSchema::number("Start frequency"))
        .with_parameter(
            "gain",
            ParameterSchema::string("LNA gain preset")
                .with_enum(["low", "high"])
                .with_default("low"),
        )
    }

    #[test]
    fn test_tool_to_schema() {
        let schema = JsonSchemaToolConverter.tool_to_schema(&sweep());

        assert_eq!(schema["name"], "spectrum.sweep");
        assert_eq!(schema["description"], "Sweep a frequency range");
        assert_eq!(schema["input_schema"]["type"], "object");

        let start = &schema["input_schema"]["properties"]["start_mhz"];
        assert_eq!(start["type"], "number");
        assert_eq!(start["description"], "Start frequency");
        assert!(start.get("enum").is_none());

        let gain = &schema["input_schema"]["properties"]["gain"];
        assert_eq!(gain["enum"], json!(["low", "high"]));
        assert_eq!(gain["default"], "low");

        assert_eq!(schema["input_schema"]["required"], json!(["start_mhz"]));
    }

    #[test]
    fn test_tools_schema_sorted_by_name() {
        let a = sweep();
        let mut b = sweep();
        b.name = "spectrum.analyze".to_string();

        let tools = JsonSchemaToolConverter.tools_schema(&[&a, &b]);

        assert_eq!(tools[0]["name"], "spectrum.analyze");
        assert_eq!(tools[1]["name"], "spectrum.sweep");
    }
}
