//! Tool domain entities

use crate::core::error::DomainError;
use crate::resource::entities::ScarceDevice;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

/// Parameters supplied to a tool call
pub type Parameters = serde_json::Map<String, Value>;

/// Dotted lowercase namespace, each segment `[a-z][a-z0-9_]*`
static NAMESPACE_PATTERN: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[a-z][a-z0-9_]*(\.[a-z][a-z0-9_]*)*$").expect("namespace pattern is valid")
});

/// Check a namespace string against the dotted-lowercase format
pub fn is_valid_namespace(namespace: &str) -> bool {
    NAMESPACE_PATTERN.is_match(namespace)
}

/// The mechanism that carries out a tool's action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportType {
    /// Spawn a native binary
    Process,
    /// One HTTP request per call
    Http,
    /// Persistent stream connection, one message in, one message out
    Socket,
    /// Out-of-process JSON-RPC tool server
    Protocol,
    /// Function table inside this process
    #[serde(rename = "internal")]
    InProcess,
}

impl TransportType {
    pub const ALL: [TransportType; 5] = [
        TransportType::Process,
        TransportType::Http,
        TransportType::Socket,
        TransportType::Protocol,
        TransportType::InProcess,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportType::Process => "process",
            TransportType::Http => "http",
            TransportType::Socket => "socket",
            TransportType::Protocol => "protocol",
            TransportType::InProcess => "internal",
        }
    }
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransportType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown transport type: {}", s))
    }
}

/// JSON type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

impl ParameterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterType::String => "string",
            ParameterType::Number => "number",
            ParameterType::Boolean => "boolean",
            ParameterType::Object => "object",
            ParameterType::Array => "array",
        }
    }

    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParameterType::String => value.is_string(),
            ParameterType::Number => value.is_number(),
            ParameterType::Boolean => value.is_boolean(),
            ParameterType::Object => value.is_object(),
            ParameterType::Array => value.is_array(),
        }
    }
}

/// Name of a JSON value's runtime type
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Schema of a single tool parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParameterSchema {
    pub fn new(param_type: ParameterType, description: impl Into<String>) -> Self {
        Self {
            param_type,
            description: description.into(),
            allowed: None,
            default: None,
        }
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::new(ParameterType::String, description)
    }

    pub fn number(description: impl Into<String>) -> Self {
        Self::new(ParameterType::Number, description)
    }

    pub fn boolean(description: impl Into<String>) -> Self {
        Self::new(ParameterType::Boolean, description)
    }

    pub fn with_enum<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether parameters travel in a JSON body
    pub fn has_body(&self) -> bool {
        !matches!(self, HttpMethod::Get)
    }
}

/// Authentication attached to HTTP tool calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HttpAuth {
    Bearer { token: String },
    Basic { username: String, password: String },
    ApiKey { header: String, token: String },
}

/// Framing of socket request payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestFormat {
    /// `{"tool": name, "parameters": {...}}`
    #[default]
    Json,
    /// `name:{...}`
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProcessConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    /// Overlaid on the inherited environment
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HttpConfig {
    pub base_url: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<HttpAuth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SocketConfig {
    /// `host:port`
    pub address: String,
    #[serde(default)]
    pub request_format: RequestFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// One live connection is kept per server id
    pub server_id: String,
    /// Launch command for the server (stdio transport)
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Name of the tool on the remote server
    pub remote_tool: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InProcessConfig {
    pub handler: String,
}

/// Transport-specific configuration, tagged by transport type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportConfig {
    Process(ProcessConfig),
    Http(HttpConfig),
    Socket(SocketConfig),
    Protocol(ProtocolConfig),
    #[serde(rename = "internal")]
    InProcess(InProcessConfig),
}

impl TransportConfig {
    pub fn transport_type(&self) -> TransportType {
        match self {
            TransportConfig::Process(_) => TransportType::Process,
            TransportConfig::Http(_) => TransportType::Http,
            TransportConfig::Socket(_) => TransportType::Socket,
            TransportConfig::Protocol(_) => TransportType::Protocol,
            TransportConfig::InProcess(_) => TransportType::InProcess,
        }
    }

    /// Configured per-call timeout, if any
    pub fn timeout_ms(&self) -> Option<u64> {
        match self {
            TransportConfig::Process(c) => c.timeout_ms,
            TransportConfig::Http(c) => c.timeout_ms,
            TransportConfig::Socket(c) => c.timeout_ms,
            TransportConfig::Protocol(c) => c.timeout_ms,
            TransportConfig::InProcess(_) => None,
        }
    }

    /// Name of the field that must be non-empty for this transport
    fn missing_field(&self) -> Option<&'static str> {
        match self {
            TransportConfig::Process(c) if c.command.trim().is_empty() => Some("command"),
            TransportConfig::Http(c) if c.base_url.trim().is_empty() => Some("base_url"),
            TransportConfig::Socket(c) if c.address.trim().is_empty() => Some("address"),
            TransportConfig::Protocol(c) if c.server_id.trim().is_empty() => Some("server_id"),
            TransportConfig::Protocol(c) if c.command.trim().is_empty() => Some("command"),
            TransportConfig::Protocol(c) if c.remote_tool.trim().is_empty() => Some("remote_tool"),
            TransportConfig::InProcess(c) if c.handler.trim().is_empty() => Some("handler"),
            _ => None,
        }
    }
}

/// Definition of a callable tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Globally unique name (e.g., "spectrum.sweep")
    #[serde(default)]
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub description: String,
    pub transport: TransportConfig,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterSchema>,
    #[serde(default)]
    pub required: Vec<String>,
    /// Workflows this tool is offered in; empty means every workflow
    #[serde(default)]
    pub workflows: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Scarce device that must be acquired for the duration of a call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_device: Option<ScarceDevice>,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        description: impl Into<String>,
        transport: TransportConfig,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            description: description.into(),
            transport,
            parameters: BTreeMap::new(),
            required: Vec::new(),
            workflows: Vec::new(),
            tags: Vec::new(),
            requires_device: None,
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, schema: ParameterSchema) -> Self {
        self.parameters.insert(name.into(), schema);
        self
    }

    /// Add a parameter and mark it required
    pub fn with_required(mut self, name: impl Into<String>, schema: ParameterSchema) -> Self {
        let name = name.into();
        self.parameters.insert(name.clone(), schema);
        if !self.required.contains(&name) {
            self.required.push(name);
        }
        self
    }

    pub fn with_workflow(mut self, workflow: impl Into<String>) -> Self {
        self.workflows.push(workflow.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_device(mut self, device: ScarceDevice) -> Self {
        self.requires_device = Some(device);
        self
    }

    pub fn transport_type(&self) -> TransportType {
        self.transport.transport_type()
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    /// Whether this tool is offered in `workflow`
    pub fn in_workflow(&self, workflow: &str) -> bool {
        self.workflows.is_empty() || self.workflows.iter().any(|w| w == workflow)
    }

    /// Case-insensitive match against name, description and tags
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&needle))
    }

    /// Check the invariants required for registration
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::MissingToolName);
        }
        if self.namespace.trim().is_empty() {
            return Err(DomainError::MissingNamespace(self.name.clone()));
        }
        if !is_valid_namespace(&self.namespace) {
            return Err(DomainError::InvalidNamespace {
                tool: self.name.clone(),
                namespace: self.namespace.clone(),
            });
        }
        if let Some(field) = self.transport.missing_field() {
            return Err(DomainError::IncompleteTransport {
                tool: self.name.clone(),
                transport: self.transport_type().to_string(),
                field: field.to_string(),
            });
        }
        Ok(())
    }
}

/// AND-combined filter over registered tools
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolQuery {
    pub namespace: Option<String>,
    pub workflow: Option<String>,
    /// Matches tools carrying any of these tags
    #[serde(default)]
    pub tags: Vec<String>,
    pub transport: Option<TransportType>,
    /// Free text over name, description and tags
    pub search: Option<String>,
}

impl ToolQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn workflow(mut self, workflow: impl Into<String>) -> Self {
        self.workflow = Some(workflow.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn transport(mut self, transport: TransportType) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn matches(&self, tool: &ToolDefinition) -> bool {
        if let Some(ns) = &self.namespace
            && &tool.namespace != ns
        {
            return false;
        }
        if let Some(workflow) = &self.workflow
            && !tool.in_workflow(workflow)
        {
            return false;
        }
        if !self.tags.is_empty() && !self.tags.iter().any(|t| tool.tags.contains(t)) {
            return false;
        }
        if let Some(transport) = self.transport
            && tool.transport_type() != transport
        {
            return false;
        }
        if let Some(text) = &self.search
            && !tool.matches_text(text)
        {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Caller context attached to a tool call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_entity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workflow(mut self, workflow: impl Into<String>) -> Self {
        self.workflow = Some(workflow.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_location(mut self, lat: f64, lon: f64) -> Self {
        self.location = Some(GeoPoint { lat, lon });
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A single call by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    pub tool: String,
    #[serde(default)]
    pub parameters: Parameters,
}

impl ToolRequest {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            parameters: Parameters::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_params(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sweep() -> ToolDefinition {
        ToolDefinition::new(
            "spectrum.sweep",
            "spectrum.hackrf",
            "Run a wideband power sweep",
            TransportConfig::Process(ProcessConfig {
                command: "hackrf_sweep".into(),
                args: vec!["-f".into(), "{{range}}".into()],
                ..ProcessConfig::default()
            }),
        )
        .with_required("range", ParameterSchema::string("Frequency range in MHz"))
        .with_tag("sdr")
        .with_device(ScarceDevice::Hackrf)
    }

    #[test]
    fn test_namespace_pattern() {
        assert!(is_valid_namespace("device"));
        assert!(is_valid_namespace("device.wifi"));
        assert!(is_valid_namespace("spectrum.hackrf_one.v2"));
        assert!(!is_valid_namespace("Device.wifi"));
        assert!(!is_valid_namespace("device..wifi"));
        assert!(!is_valid_namespace("device."));
        assert!(!is_valid_namespace("2g.cellular"));
        assert!(!is_valid_namespace("device-wifi"));
    }

    #[test]
    fn test_validate_accepts_well_formed_tool() {
        assert_eq!(sweep().validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_missing_name_and_namespace() {
        let mut tool = sweep();
        tool.name = "  ".into();
        assert_eq!(tool.validate(), Err(DomainError::MissingToolName));

        let mut tool = sweep();
        tool.namespace = String::new();
        assert_eq!(
            tool.validate(),
            Err(DomainError::MissingNamespace("spectrum.sweep".into()))
        );
    }

    #[test]
    fn test_validate_rejects_bad_namespace() {
        let mut tool = sweep();
        tool.namespace = "Spectrum.HackRF".into();
        let err = tool.validate().unwrap_err();
        assert!(err.to_string().contains("invalid namespace format: Spectrum.HackRF"));
    }

    #[test]
    fn test_validate_rejects_incomplete_transport() {
        let mut tool = sweep();
        tool.transport = TransportConfig::Http(HttpConfig::default());
        assert!(matches!(
            tool.validate(),
            Err(DomainError::IncompleteTransport { ref field, .. }) if field == "base_url"
        ));
    }

    #[test]
    fn test_transport_type_serializes_internal() {
        let json = serde_json::to_value(TransportType::InProcess).unwrap();
        assert_eq!(json, "internal");
        assert_eq!("internal".parse::<TransportType>(), Ok(TransportType::InProcess));
    }

    #[test]
    fn test_definition_from_toml_style_json() {
        let tool: ToolDefinition = serde_json::from_value(serde_json::json!({
            "namespace": "geo",
            "description": "Distance between two points",
            "transport": { "type": "internal", "handler": "geo.distance" },
            "parameters": {
                "lat1": { "type": "number", "description": "Latitude 1" },
                "unit": { "type": "string", "enum": ["km", "mi"] }
            },
            "required": ["lat1"]
        }))
        .unwrap();
        assert_eq!(tool.transport_type(), TransportType::InProcess);
        assert_eq!(tool.parameters["unit"].allowed.as_ref().unwrap().len(), 2);
        assert!(tool.is_required("lat1"));
    }

    #[test]
    fn test_query_workflow_includes_unscoped_tools() {
        let scoped = sweep().with_workflow("survey");
        let unscoped = sweep();
        let q = ToolQuery::new().workflow("tracking");
        assert!(!q.matches(&scoped));
        assert!(q.matches(&unscoped));
    }

    #[test]
    fn test_query_tags_match_any() {
        let tool = sweep();
        assert!(ToolQuery::new().tag("wifi").tag("sdr").matches(&tool));
        assert!(!ToolQuery::new().tag("wifi").matches(&tool));
    }

    #[test]
    fn test_query_combines_filters() {
        let tool = sweep();
        let q = ToolQuery::new()
            .namespace("spectrum.hackrf")
            .transport(TransportType::Process)
            .search("WIDEBAND");
        assert!(q.matches(&tool));
        assert!(!q.clone().transport(TransportType::Http).matches(&tool));
    }
}
