//! Socket backend: request/response over long-lived TCP connections
//!
//! One connection is kept per address and reused across calls. Frames are
//! newline delimited: the request is one line, the first line read back is
//! the response.
//!
//! A connection whose exchange times out, errors or is abandoned mid-flight
//! is poisoned. Callers queued on it see the flag once they get the stream
//! and reconnect, so a late reply is never read as the answer to another
//! request. The tool timeout covers queueing, connecting and the exchange.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use argos_application::ports::tool_backend::{AdapterError, ToolBackendAdapter};
use argos_domain::tool::{
    entities::{
        ExecutionContext, Parameters, RequestFormat, SocketConfig, ToolDefinition, TransportConfig,
        TransportType,
    },
    value_objects::ToolExecutionResult,
};
use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{DEFAULT_TIMEOUT_MS, KeyedLocks, timeout_for};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

struct Connection {
    stream: Mutex<BufReader<TcpStream>>,
    poisoned: AtomicBool,
}

impl Connection {
    fn new(stream: TcpStream) -> Self {
        Self {
            stream: Mutex::new(BufReader::new(stream)),
            poisoned: AtomicBool::new(false),
        }
    }

    fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::SeqCst)
    }
}

/// Poisons and forgets the connection unless the exchange completed
struct InFlight<'a> {
    adapter: &'a SocketAdapter,
    address: &'a str,
    conn: &'a Arc<Connection>,
    completed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.conn.poisoned.store(true, Ordering::SeqCst);
            self.adapter.forget(self.address, self.conn);
        }
    }
}

/// Why a socket exchange failed
enum Failure {
    Timeout(String),
    Error(String),
}

pub struct SocketAdapter {
    connections: StdMutex<BTreeMap<String, Arc<Connection>>>,
    connecting: KeyedLocks,
    initialized: AtomicBool,
    default_timeout_ms: u64,
}

/// Encode a request as a single line
fn encode_request(format: RequestFormat, tool: &str, params: &Parameters) -> String {
    let params = Value::Object(params.clone());
    match format {
        RequestFormat::Json => json!({ "tool": tool, "parameters": params }).to_string(),
        RequestFormat::Text => format!("{}:{}", tool, params),
    }
}

/// Parse a response line as JSON, falling back to the raw string
fn decode_response(line: &str) -> Value {
    let line = line.trim_end_matches(['\r', '\n']);
    serde_json::from_str(line).unwrap_or_else(|_| Value::String(line.to_string()))
}

/// Write one frame and read the next line back
async fn exchange(stream: &mut BufReader<TcpStream>, request: &str) -> Result<Value, Failure> {
    let frame = format!("{}\n", request);
    let writer = stream.get_mut();
    if let Err(e) = async {
        writer.write_all(frame.as_bytes()).await?;
        writer.flush().await
    }
    .await
    {
        return Err(Failure::Error(format!("Failed to send socket message: {}", e)));
    }

    let mut line = String::new();
    match stream.read_line(&mut line).await {
        Ok(0) => Err(Failure::Error("Socket closed by peer".to_string())),
        Ok(_) => Ok(decode_response(&line)),
        Err(e) => Err(Failure::Error(format!("Socket error: {}", e))),
    }
}

impl SocketAdapter {
    pub fn new() -> Self {
        Self {
            connections: StdMutex::new(BTreeMap::new()),
            connecting: KeyedLocks::default(),
            initialized: AtomicBool::new(false),
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_default_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.default_timeout_ms = timeout_ms;
        self
    }

    fn lock_connections(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Arc<Connection>>> {
        self.connections.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn connection_count(&self) -> usize {
        self.lock_connections().len()
    }

    pub fn connected_addresses(&self) -> Vec<String> {
        self.lock_connections().keys().cloned().collect()
    }

    /// The open connection for `address`, dropping it if poisoned
    fn live(&self, address: &str) -> Option<Arc<Connection>> {
        let mut connections = self.lock_connections();
        let conn = Arc::clone(connections.get(address)?);
        if conn.is_poisoned() {
            connections.remove(address);
            return None;
        }
        Some(conn)
    }

    /// Remove `conn` from the map if it is still the entry for `address`
    fn forget(&self, address: &str, conn: &Arc<Connection>) {
        let mut connections = self.lock_connections();
        if connections.get(address).is_some_and(|current| Arc::ptr_eq(current, conn)) {
            connections.remove(address);
            debug!(address = %address, "Discarded socket connection");
        }
    }

    async fn connection(&self, address: &str) -> Result<Arc<Connection>, Failure> {
        if let Some(conn) = self.live(address) {
            return Ok(conn);
        }

        // Only callers of the same address wait on this
        let gate = self.connecting.lock_for(address);
        let _connecting = gate.lock().await;
        if let Some(conn) = self.live(address) {
            return Ok(conn);
        }

        debug!(address = %address, "Opening socket connection");
        let stream = match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(Failure::Error(format!("Socket connection failed: {}", e))),
            Err(_) => return Err(Failure::Timeout("Socket connection timeout".to_string())),
        };

        let conn = Arc::new(Connection::new(stream));
        self.lock_connections()
            .insert(address.to_string(), Arc::clone(&conn));
        Ok(conn)
    }

    /// Send one request on a healthy connection, reconnecting past poisoned ones
    async fn request(&self, address: &str, request: &str) -> Result<Value, Failure> {
        loop {
            let conn = self.connection(address).await?;
            let mut stream = conn.stream.lock().await;
            if conn.is_poisoned() {
                debug!(address = %address, "Connection poisoned while queued, reconnecting");
                continue;
            }

            let mut in_flight = InFlight {
                adapter: self,
                address,
                conn: &conn,
                completed: false,
            };
            let outcome = exchange(&mut stream, request).await;
            in_flight.completed = outcome.is_ok();
            return outcome;
        }
    }

    async fn call(&self, tool: &ToolDefinition, config: &SocketConfig, params: &Parameters) -> ToolExecutionResult {
        let timeout = timeout_for(config.timeout_ms, self.default_timeout_ms);
        let request = encode_request(config.request_format, &tool.name, params);

        let outcome = match tokio::time::timeout(timeout, self.request(&config.address, &request)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(Failure::Timeout(format!(
                "Socket response timeout after {}ms",
                timeout.as_millis()
            ))),
        };

        match outcome {
            Ok(data) => ToolExecutionResult::success(&tool.name, TransportType::Socket, data),
            Err(Failure::Timeout(message)) => {
                ToolExecutionResult::timeout(&tool.name, TransportType::Socket, message)
            }
            Err(Failure::Error(message)) => {
                warn!(tool = %tool.name, address = %config.address, error = %message, "Socket call failed");
                ToolExecutionResult::error(&tool.name, TransportType::Socket, message)
            }
        }
    }
}

impl Default for SocketAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolBackendAdapter for SocketAdapter {
    fn transport(&self) -> TransportType {
        TransportType::Socket
    }

    async fn initialize(&self) -> Result<(), AdapterError> {
        info!("Socket adapter ready");
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
            TransportConfig::Socket(config) => self.call(tool, config, params).await,
            other => ToolExecutionResult::error(
                &tool.name,
                TransportType::Socket,
                format!("Tool {} is not a socket tool ({})", tool.name, other.transport_type()),
            ),
        };
        result.with_duration(started.elapsed())
    }

    async fn health_check(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    async fn cleanup(&self) -> Result<(), AdapterError> {
        let closed = std::mem::take(&mut *self.lock_connections());
        for (address, conn) in closed {
            conn.poisoned.store(true, Ordering::SeqCst);
            if let Err(e) = conn.stream.lock().await.get_mut().shutdown().await {
                debug!(address = %address, error = %e, "Socket shutdown failed");
            }
        }
        self.initialized.store(false, Ordering::SeqCst);
        Ok(())
    }
}
