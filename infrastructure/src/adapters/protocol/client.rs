//! JSON-RPC client for one tool server
//!
//! A single background task owns the read half and routes each incoming
//! message:
//!
//! - **Response** → the `pending` oneshot registered under its id
//! - **Request** from the server → answered with "method not found"
//! - **Notification** → logged and dropped
//!
//! When the reader ends (EOF, I/O error, child exit) every pending request
//! is failed with [`ProtocolError::TransportClosed`].

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, RwLock, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::error::{ProtocolError, Result};
use super::message::{
    JsonRpcErrorOut, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, MessageKind,
    classify_message,
};

type Writer = Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>;
type Pending = Arc<RwLock<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;

pub struct ProtocolClient {
    /// Background reader task handle.
    reader_handle: JoinHandle<()>,

    /// Request-response correlation (request_id -> oneshot sender).
    pending: Pending,

    /// Serialized writes, shared with the reader for replies to server requests.
    writer: Writer,

    /// Server child process (killed on Drop to prevent orphans).
    child: Mutex<Option<Child>>,

    closed: Arc<AtomicBool>,
}

impl ProtocolClient {
    /// Launch a server and connect to its stdio.
    ///
    /// The handshake is not performed; call [`initialize`](Self::initialize).
    pub fn spawn(command: &str, args: &[String]) -> Result<Self> {
        debug!("Spawning protocol server: {} {}", command, args.join(" "));

        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        // Linux: request kernel to send SIGTERM to child when parent dies.
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                Ok(())
            });
        }

        let mut child = cmd.spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProtocolError::Io(std::io::Error::other("Failed to capture stdout")))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ProtocolError::Io(std::io::Error::other("Failed to capture stdin")))?;

        let mut client = Self::connect(stdout, stdin);
        client.child = Mutex::new(Some(child));
        Ok(client)
    }

    /// Connect over an arbitrary byte stream pair.
    pub fn connect<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let writer: Writer = Arc::new(Mutex::new(Box::new(writer)));
        let pending: Pending = Arc::new(RwLock::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));

        let reader_handle = tokio::spawn(Self::reader_loop(
            reader,
            Arc::clone(&pending),
            Arc::clone(&writer),
            Arc::clone(&closed),
        ));

        Self {
            reader_handle,
            pending,
            writer,
            child: Mutex::new(None),
            closed,
        }
    }

    async fn reader_loop<R>(reader: R, pending: Pending, writer: Writer, closed: Arc<AtomicBool>)
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let mut lines = BufReader::new(reader).lines();

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("Protocol reader: server closed stdout");
                    break;
                }
                Err(e) => {
                    warn!("Protocol reader: read error: {}", e);
                    break;
                }
            };

            if line.trim().is_empty() {
                continue;
            }
            trace!("Protocol received: {}", line);

            let message: Value = match serde_json::from_str(&line) {
                Ok(v) => v,
                Err(e) => {
                    warn!("Protocol reader: failed to parse JSON: {}: {}", e, line);
                    continue;
                }
            };

            match classify_message(&message) {
                MessageKind::Response => {
                    let response: JsonRpcResponse = match serde_json::from_value(message) {
                        Ok(r) => r,
                        Err(e) => {
                            warn!("Protocol reader: failed to parse response: {}", e);
                            continue;
                        }
                    };
                    let Some(id) = response.id else {
                        continue;
                    };
                    let sender = pending.write().await.remove(&id);
                    match sender {
                        Some(tx) => {
                            let _ = tx.send(response);
                        }
                        None => debug!("Protocol reader: no pending receiver for id={}", id),
                    }
                }
                MessageKind::Request { id, method } => {
                    debug!("Protocol reader: rejecting server request {}", method);
                    let reply = JsonRpcErrorOut::method_not_found(id, &method);
                    if let Err(e) = write_line(&writer, &reply).await {
                        warn!("Protocol reader: failed to answer {}: {}", method, e);
                    }
                }
                MessageKind::Notification => {
                    trace!("Protocol reader: ignoring notification");
                }
                MessageKind::Unknown => {
                    debug!("Protocol reader: unrecognized message");
                }
            }
        }

        closed.store(true, Ordering::SeqCst);
        // Dropping the senders wakes every waiter with TransportClosed
        pending.write().await.clear();
    }

    /// Whether the server side has gone away
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Send a request and wait for the correlated response's `result`.
    pub async fn request(&self, request: &JsonRpcRequest, timeout: Duration) -> Result<Value> {
        if self.is_closed() {
            return Err(ProtocolError::TransportClosed);
        }

        let (tx, rx) = oneshot::channel();
        let request_id = request.id;
        self.pending.write().await.insert(request_id, tx);
        if self.is_closed() {
            self.pending.write().await.remove(&request_id);
            return Err(ProtocolError::TransportClosed);
        }

        if let Err(e) = write_line(&self.writer, request).await {
            self.pending.write().await.remove(&request_id);
            return Err(e);
        }

        let response = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(ProtocolError::TransportClosed),
            Err(_) => {
                self.pending.write().await.remove(&request_id);
                return Err(ProtocolError::Timeout(timeout.as_millis()));
            }
        };

        if let Some(error) = response.error {
            return Err(ProtocolError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        response
            .result
            .ok_or_else(|| ProtocolError::UnexpectedResponse(format!("Response {} has no result", request_id)))
    }

    pub async fn notify(&self, notification: &JsonRpcNotification) -> Result<()> {
        write_line(&self.writer, notification).await
    }

    /// Perform the `initialize` handshake, returning the server's answer.
    pub async fn initialize(&self, timeout: Duration) -> Result<Value> {
        let server = self.request(&JsonRpcRequest::initialize(), timeout).await?;
        self.notify(&JsonRpcNotification::initialized()).await?;

        let name = server
            .pointer("/serverInfo/name")
            .and_then(|n| n.as_str())
            .unwrap_or("unknown");
        info!("Protocol server initialized: {}", name);
        Ok(server)
    }

    /// Invoke a remote tool, returning the raw result envelope
    pub async fn call_tool(&self, name: &str, arguments: Value, timeout: Duration) -> Result<Value> {
        self.request(&JsonRpcRequest::call_tool(name, arguments), timeout)
            .await
    }

    /// Stop the reader and terminate the server.
    pub async fn shutdown(&self) {
        if let Err(e) = self.writer.lock().await.shutdown().await {
            debug!("Protocol client: closing stdin failed: {}", e);
        }
        if let Some(child) = self.child.lock().await.as_mut() {
            let _ = child.kill().await;
        }
        self.reader_handle.abort();
        self.closed.store(true, Ordering::SeqCst);
    }
}

async fn write_line<T: Serialize>(writer: &Writer, message: &T) -> Result<()> {
    let mut line = serde_json::to_string(message)?;
    trace!("Protocol sending: {}", line);
    line.push('\n');

    let mut writer = writer.lock().await;
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

impl Drop for ProtocolClient {
    fn drop(&mut self) {
        self.reader_handle.abort();
        if let Some(child) = self.child.get_mut().as_mut() {
            debug!("ProtocolClient dropping, killing server process");
            let _ = child.start_kill();
        }
    }
}
