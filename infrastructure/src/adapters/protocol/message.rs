//! JSON-RPC 2.0 message types for tool servers.
//!
//! Messages are newline-delimited JSON objects on the server's stdio.
//!
//! - **Requests**: client → server (`initialize`, `tools/call`)
//! - **Notifications**: either direction, no `id` (`notifications/initialized`)
//! - **Responses**: server → client (result or error)

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};

/// Protocol revision announced in the handshake
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const CLIENT_NAME: &str = "argos-tool-executor";
pub const CLIENT_VERSION: &str = "1.0.0";

/// JSON-RPC "method not found"
pub const METHOD_NOT_FOUND: i64 = -32601;

static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    REQUEST_ID.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Creates a request with a process-wide unique id.
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id: next_id(),
            method: method.into(),
            params,
        }
    }

    pub fn initialize() -> Self {
        Self::new(
            "initialize",
            Some(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": { "name": CLIENT_NAME, "version": CLIENT_VERSION },
            })),
        )
    }

    pub fn call_tool(name: &str, arguments: Value) -> Self {
        Self::new("tools/call", Some(json!({ "name": name, "arguments": arguments })))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: &'static str,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params,
        }
    }

    pub fn initialized() -> Self {
        Self::new("notifications/initialized", None)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub jsonrpc: String,
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Error reply to a request the server sent us
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcErrorOut {
    pub jsonrpc: &'static str,
    pub id: Value,
    pub error: RpcError,
}

impl JsonRpcErrorOut {
    pub fn method_not_found(id: Value, method: &str) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            error: RpcError {
                code: METHOD_NOT_FOUND,
                message: format!("Method not found: {}", method),
                data: None,
            },
        }
    }
}

/// Shape of an incoming message
#[derive(Debug, PartialEq)]
pub enum MessageKind {
    Response,
    Request { id: Value, method: String },
    Notification,
    Unknown,
}

pub fn classify_message(message: &Value) -> MessageKind {
    let id = message.get("id").filter(|id| !id.is_null());
    let method = message.get("method").and_then(|m| m.as_str());
    match (id, method) {
        (Some(id), Some(method)) => MessageKind::Request {
            id: id.clone(),
            method: method.to_string(),
        },
        (Some(_), None) => MessageKind::Response,
        (None, Some(_)) => MessageKind::Notification,
        (None, None) => MessageKind::Unknown,
    }
}

/// Unwrap a `tools/call` result envelope.
///
/// | Content | Data |
/// |---------|------|
/// | first block is text | the text parsed as JSON, or the raw text |
/// | first block is not text | the whole content list |
/// | empty or missing | `null` |
pub fn unwrap_tool_content(result: &Value) -> Value {
    let Some(content) = result.get("content").and_then(|c| c.as_array()) else {
        return Value::Null;
    };
    let Some(first) = content.first() else {
        return Value::Null;
    };

    if first.get("type").and_then(|t| t.as_str()) == Some("text") {
        let text = first.get("text").and_then(|t| t.as_str()).unwrap_or_default();
        serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
    } else {
        Value::Array(content.clone())
    }
}

/// Whether a `tools/call` result reports a tool-level failure
pub fn is_tool_error(result: &Value) -> bool {
    result.get("isError").and_then(|v| v.as_bool()).unwrap_or(false)
}
