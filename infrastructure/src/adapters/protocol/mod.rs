//! Protocol backend: tools hosted by external JSON-RPC tool servers
//!
//! Each server is launched once per `server_id` on first use, kept alive
//! across calls and reconnected if its process goes away. Calls use
//! `tools/call` and the result envelope is unwrapped into plain data.

pub mod client;
pub mod error;
pub mod message;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use argos_application::ports::tool_backend::{AdapterError, ToolBackendAdapter};
use argos_domain::tool::{
    entities::{ExecutionContext, Parameters, ProtocolConfig, ToolDefinition, TransportConfig, TransportType},
    value_objects::ToolExecutionResult,
};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{DEFAULT_TIMEOUT_MS, KeyedLocks, timeout_for};
pub use client::ProtocolClient;
pub use error::ProtocolError;
use message::{is_tool_error, unwrap_tool_content};

/// Upper bound on the handshake, whatever the tool allows
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ProtocolAdapter {
    clients: Mutex<BTreeMap<String, Arc<ProtocolClient>>>,
    launching: KeyedLocks,
    initialized: AtomicBool,
    default_timeout_ms: u64,
}

impl ProtocolAdapter {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(BTreeMap::new()),
            launching: KeyedLocks::default(),
            initialized: AtomicBool::new(false),
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_default_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.default_timeout_ms = timeout_ms;
        self
    }

    fn lock_clients(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Arc<ProtocolClient>>> {
        self.clients.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Launch and handshake a server unless a live connection exists.
    pub async fn connect_server(&self, server_id: &str, command: &str, args: &[String]) -> Result<(), ProtocolError> {
        let deadline = tokio::time::Instant::now() + HANDSHAKE_TIMEOUT;
        self.client_for(server_id, command, args, deadline).await.map(|_| ())
    }

    /// Use an already connected client for `server_id`
    pub fn attach(&self, server_id: impl Into<String>, client: ProtocolClient) {
        self.lock_clients().insert(server_id.into(), Arc::new(client));
    }

    /// Close the connection to one server. Returns `false` if it was not connected.
    pub async fn disconnect(&self, server_id: &str) -> bool {
        let removed = self.lock_clients().remove(server_id);
        match removed {
            Some(client) => {
                client.shutdown().await;
                info!(server = %server_id, "Disconnected protocol server");
                true
            }
            None => false,
        }
    }

    pub fn connected_servers(&self) -> Vec<String> {
        self.lock_clients().keys().cloned().collect()
    }

    pub fn connection_count(&self) -> usize {
        self.lock_clients().len()
    }

    /// The live client for `server_id`, forgetting one whose process went away
    fn live_client(&self, server_id: &str) -> Option<Arc<ProtocolClient>> {
        let mut clients = self.lock_clients();
        let client = Arc::clone(clients.get(server_id)?);
        if client.is_closed() {
            warn!(server = %server_id, "Protocol server connection lost, reconnecting");
            clients.remove(server_id);
            return None;
        }
        Some(client)
    }

    /// Connect `server_id` before `deadline`
    ///
    /// Launches are serialized per server id so one server is never started
    /// twice; other servers are not held up.
    async fn client_for(
        &self,
        server_id: &str,
        command: &str,
        args: &[String],
        deadline: tokio::time::Instant,
    ) -> Result<Arc<ProtocolClient>, ProtocolError> {
        if let Some(client) = self.live_client(server_id) {
            return Ok(client);
        }

        let gate = self.launching.lock_for(server_id);
        let budget = deadline.saturating_duration_since(tokio::time::Instant::now());
        let Ok(_launching) = tokio::time::timeout_at(deadline, gate.lock()).await else {
            return Err(ProtocolError::Timeout(budget.as_millis()));
        };
        if let Some(client) = self.live_client(server_id) {
            return Ok(client);
        }

        info!(server = %server_id, command = %command, "Connecting protocol server");
        let client = ProtocolClient::spawn(command, args)?;
        let handshake = deadline
            .saturating_duration_since(tokio::time::Instant::now())
            .min(HANDSHAKE_TIMEOUT);
        if let Err(e) = client.initialize(handshake).await {
            client.shutdown().await;
            return Err(e);
        }

        let client = Arc::new(client);
        self.lock_clients()
            .insert(server_id.to_string(), Arc::clone(&client));
        Ok(client)
    }

    async fn call(&self, tool: &ToolDefinition, config: &ProtocolConfig, params: &Parameters) -> ToolExecutionResult {
        let timeout = timeout_for(config.timeout_ms, self.default_timeout_ms);
        let deadline = tokio::time::Instant::now() + timeout;

        let client = match self
            .client_for(&config.server_id, &config.command, &config.args, deadline)
            .await
        {
            Ok(client) => client,
            Err(e) => {
                let message = format!("Failed to connect to protocol server {}: {}", config.server_id, e);
                return if e.is_timeout() {
                    ToolExecutionResult::timeout(&tool.name, TransportType::Protocol, message)
                } else {
                    ToolExecutionResult::error(&tool.name, TransportType::Protocol, message)
                };
            }
        };

        debug!(tool = %tool.name, server = %config.server_id, remote = %config.remote_tool, "Calling remote tool");
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        let envelope = match client
            .call_tool(&config.remote_tool, Value::Object(params.clone()), remaining)
            .await
        {
            Ok(envelope) => envelope,
            Err(e) if e.is_timeout() => {
                return ToolExecutionResult::timeout(&tool.name, TransportType::Protocol, e.to_string());
            }
            Err(e) => {
                return ToolExecutionResult::error(&tool.name, TransportType::Protocol, e.to_string());
            }
        };

        let data = unwrap_tool_content(&envelope);
        if is_tool_error(&envelope) {
            let message = match &data {
                Value::String(text) => text.clone(),
                _ => format!("Remote tool {} reported an error", config.remote_tool),
            };
            return ToolExecutionResult::error(&tool.name, TransportType::Protocol, message).with_details(data);
        }

        ToolExecutionResult::success(&tool.name, TransportType::Protocol, data)
    }
}

impl Default for ProtocolAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolBackendAdapter for ProtocolAdapter {
    fn transport(&self) -> TransportType {
        TransportType::Protocol
    }

    async fn initialize(&self) -> Result<(), AdapterError> {
        info!("Protocol adapter ready");
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn execute(
        &self,
        tool: &ToolDefinition,
        params: &Parameters,
        _context: Option<&ExecutionContext>,
    ) -> ToolExecutionResult {
        let started = Instant::now();
        let result = match &tool.transport {
            TransportConfig::Protocol(config) => self.call(tool, config, params).await,
            other => ToolExecutionResult::error(
                &tool.name,
                TransportType::Protocol,
                format!("Tool {} is not a protocol tool ({})", tool.name, other.transport_type()),
            ),
        };
        result.with_duration(started.elapsed())
    }

    /// Healthy once at least one server is connected
    async fn health_check(&self) -> bool {
        self.initialized.load(Ordering::SeqCst) && self.connection_count() > 0
    }

    async fn cleanup(&self) -> Result<(), AdapterError> {
        let clients = std::mem::take(&mut *self.lock_clients());
        for (server_id, client) in clients {
            client.shutdown().await;
            debug!(server = %server_id, "Protocol server stopped");
        }
        self.initialized.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argos_domain::tool::value_objects::ExecutionStatus;
    use serde_json::json;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, duplex, split};

    /// In-memory server answering `tools/call` with `respond(params)`
    fn fake_server(respond: fn(&Value) -> Value) -> ProtocolClient {
        let (client_io, server_io) = duplex(64 * 1024);
        let (client_read, client_write) = split(client_io);
        let (server_read, mut server_write) = split(server_io);

        tokio::spawn(async move {
            let mut lines = BufReader::new(server_read).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let request: Value = serde_json::from_str(&line).unwrap();
                if request.get("id").is_none() {
                    continue;
                }
                let reply = json!({"jsonrpc": "2.0", "id": request["id"], "result": respond(&request["params"])});
                server_write
                    .write_all(format!("{}\n", reply).as_bytes())
                    .await
                    .unwrap();
            }
        });

        ProtocolClient::connect(client_read, client_write)
    }

    fn protocol_tool(timeout_ms: Option<u64>) -> ToolDefinition {
        ToolDefinition::new(
            "rf.analyze",
            "rf",
            "Analyze a capture",
            TransportConfig::Protocol(ProtocolConfig {
                server_id: "rf-server".to_string(),
                command: "argos-rf-server".to_string(),
                args: Vec::new(),
                remote_tool: "analyze".to_string(),
                timeout_ms,
            }),
        )
    }

    #[tokio::test]
    async fn test_call_unwraps_json_text_content() {
        let adapter = ProtocolAdapter::new();
        adapter.attach(
            "rf-server",
            fake_server(|params| {
                let text = json!({"tool": params["name"], "args": params["arguments"]}).to_string();
                json!({"content": [{"type": "text", "text": text}]})
            }),
        );

        let mut params = Parameters::new();
        params.insert("file".to_string(), json!("cap.iq"));
        let result = adapter.execute(&protocol_tool(None), &params, None).await;

        assert_eq!(result.status, ExecutionStatus::Success);
        assert_eq!(result.backend, TransportType::Protocol);
        assert_eq!(result.data.unwrap(), json!({"tool": "analyze", "args": {"file": "cap.iq"}}));
    }

    #[tokio::test]
    async fn test_is_error_envelope_maps_to_error() {
        let adapter = ProtocolAdapter::new();
        adapter.attach(
            "rf-server",
            fake_server(|_| json!({"isError": true, "content": [{"type": "text", "text": "no capture"}]})),
        );

        let result = adapter.execute(&protocol_tool(None), &Parameters::new(), None).await;

        assert_eq!(result.status, ExecutionStatus::Error);
        assert_eq!(result.error.as_deref(), Some("no capture"));
    }

    #[tokio::test]
    async fn test_empty_content_is_null_success() {
        let adapter = ProtocolAdapter::new();
        adapter.attach("rf-server", fake_server(|_| json!({"content": []})));

        let result = adapter.execute(&protocol_tool(None), &Parameters::new(), None).await;

        assert!(result.is_success());
        assert_eq!(result.data, Some(Value::Null));
    }

    #[tokio::test]
    async fn test_unlaunchable_server_reports_connect_failure() {
        let adapter = ProtocolAdapter::new();

        let result = adapter.execute(&protocol_tool(None), &Parameters::new(), None).await;

        assert_eq!(result.status, ExecutionStatus::Error);
        assert!(
            result
                .error
                .unwrap()
                .starts_with("Failed to connect to protocol server rf-server")
        );
        assert_eq!(adapter.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_health_and_disconnect() {
        let adapter = ProtocolAdapter::new();
        adapter.initialize().await.unwrap();
        assert!(!adapter.health_check().await);

        adapter.attach("rf-server", fake_server(|_| json!({"content": []})));
        assert!(adapter.health_check().await);
        assert_eq!(adapter.connected_servers(), vec!["rf-server".to_string()]);

        assert!(adapter.disconnect("rf-server").await);
        assert!(!adapter.disconnect("rf-server").await);
        assert!(!adapter.health_check().await);
    }

    fn silent_server_tool(server_id: &str, timeout_ms: u64) -> ToolDefinition {
        ToolDefinition::new(
            "rf.silent",
            "rf",
            "Server that never answers",
            TransportConfig::Protocol(ProtocolConfig {
                server_id: server_id.to_string(),
                command: "sleep".to_string(),
                args: vec!["60".to_string()],
                remote_tool: "analyze".to_string(),
                timeout_ms: Some(timeout_ms),
            }),
        )
    }

    #[tokio::test]
    async fn test_handshake_is_bounded_by_tool_timeout() {
        let adapter = ProtocolAdapter::new();

        let started = Instant::now();
        let result = adapter
            .execute(&silent_server_tool("silent", 300), &Parameters::new(), None)
            .await;

        assert_eq!(result.status, ExecutionStatus::Timeout);
        assert!(started.elapsed() < Duration::from_millis(1300));
        assert!(
            result
                .error
                .unwrap()
                .starts_with("Failed to connect to protocol server silent")
        );
        assert_eq!(adapter.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_slow_launch_does_not_block_other_servers() {
        let adapter = ProtocolAdapter::new();
        adapter.attach("rf-server", fake_server(|_| json!({"content": []})));

        let silent_tool = silent_server_tool("silent", 1000);
        let silent_params = Parameters::new();
        let (slow, fast) = tokio::join!(
            adapter.execute(&silent_tool, &silent_params, None),
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                let started = Instant::now();
                let result = adapter.execute(&protocol_tool(None), &Parameters::new(), None).await;
                (result, started.elapsed())
            }
        );

        assert_eq!(slow.status, ExecutionStatus::Timeout);
        let (fast, elapsed) = fast;
        assert!(fast.is_success());
        assert!(elapsed < Duration::from_millis(500));
    }
}
