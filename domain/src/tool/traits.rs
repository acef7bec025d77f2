//! Tool domain traits
//!
//! Contains pure domain logic traits for parameter validation.
//! The async backend port is defined in the application layer (ports).

use super::entities::{Parameters, ToolDefinition, json_type_name};
use serde_json::Value;

/// Validator for tool call parameters
///
/// Pure check of supplied parameters against a definition's schema, with no
/// I/O. The error string is surfaced verbatim in the execution result.
pub trait ToolValidator: Send + Sync {
    fn validate(&self, definition: &ToolDefinition, params: &Parameters) -> Result<(), String>;
}

/// Default implementation of ToolValidator
///
/// - every required parameter must be present
/// - a declared type must match the runtime JSON type
/// - a declared enum must contain the value
///
/// Parameters missing from the schema pass through untouched.
#[derive(Debug, Clone, Default)]
pub struct DefaultToolValidator;

fn render_enum(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

impl ToolValidator for DefaultToolValidator {
    fn validate(&self, definition: &ToolDefinition, params: &Parameters) -> Result<(), String> {
        for name in &definition.required {
            if !params.contains_key(name) {
                return Err(format!("Missing required parameter: {}", name));
            }
        }

        for (name, value) in params {
            let Some(schema) = definition.parameters.get(name) else {
                continue;
            };

            if !schema.param_type.accepts(value) {
                return Err(format!(
                    "Parameter {} must be a {}, got {}",
                    name,
                    schema.param_type.as_str(),
                    json_type_name(value)
                ));
            }

            if let Some(allowed) = &schema.allowed
                && !allowed.contains(value)
            {
                return Err(format!(
                    "Parameter {} must be one of: {}",
                    name,
                    render_enum(allowed)
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::entities::{InProcessConfig, ParameterSchema, TransportConfig};
    use serde_json::json;

    fn distance_tool() -> ToolDefinition {
        ToolDefinition::new(
            "geo.distance",
            "geo",
            "Great-circle distance",
            TransportConfig::InProcess(InProcessConfig {
                handler: "geo.distance".into(),
            }),
        )
        .with_required("lat1", ParameterSchema::number("Latitude 1"))
        .with_required("lon1", ParameterSchema::number("Longitude 1"))
        .with_parameter("unit", ParameterSchema::string("Unit").with_enum(["km", "mi"]))
    }

    fn params(value: Value) -> Parameters {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_validator_missing_required() {
        let result = DefaultToolValidator.validate(&distance_tool(), &params(json!({"lat1": 1.0})));
        assert_eq!(result, Err("Missing required parameter: lon1".to_string()));
    }

    #[test]
    fn test_validator_type_mismatch() {
        let result = DefaultToolValidator.validate(
            &distance_tool(),
            &params(json!({"lat1": "north", "lon1": 2.0})),
        );
        assert_eq!(
            result,
            Err("Parameter lat1 must be a number, got string".to_string())
        );
    }

    #[test]
    fn test_validator_enum_membership() {
        let result = DefaultToolValidator.validate(
            &distance_tool(),
            &params(json!({"lat1": 1, "lon1": 2, "unit": "furlong"})),
        );
        assert_eq!(
            result,
            Err("Parameter unit must be one of: km, mi".to_string())
        );
    }

    #[test]
    fn test_validator_unknown_params_pass_through() {
        let result = DefaultToolValidator.validate(
            &distance_tool(),
            &params(json!({"lat1": 1, "lon1": 2, "precision": 3})),
        );
        assert!(result.is_ok());
    }
}
