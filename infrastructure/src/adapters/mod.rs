//! Tool backend adapters
//!
//! One [`ToolBackendAdapter`](argos_application::ports::tool_backend::ToolBackendAdapter)
//! implementation per transport:
//!
//! | Adapter | Transport | Talks to |
//! |---------|-----------|----------|
//! | [`ProcessAdapter`] | `process` | a child process per call |
//! | [`HttpAdapter`] | `http` | a REST endpoint |
//! | [`SocketAdapter`] | `socket` | a long-lived TCP peer, newline framed |
//! | [`ProtocolAdapter`] | `protocol` | a JSON-RPC tool server over stdio |
//! | [`InProcessAdapter`] | `internal` | a handler function in this process |

pub mod builtin;
pub mod http;
pub mod in_process;
pub mod process;
pub mod protocol;
pub mod socket;

pub use builtin::{builtin_tools, register_builtin_handlers};
pub use http::HttpAdapter;
pub use in_process::{InProcessAdapter, InProcessHandler};
pub use process::ProcessAdapter;
pub use protocol::ProtocolAdapter;
pub use socket::SocketAdapter;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Timeout used when neither the tool nor the adapter configures one
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

fn timeout_for(configured: Option<u64>, fallback_ms: u64) -> Duration {
    Duration::from_millis(configured.unwrap_or(fallback_ms))
}

/// One async lock per key, created on first use
///
/// Holding the lock for one key never blocks work on another.
#[derive(Default)]
struct KeyedLocks {
    locks: Mutex<BTreeMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyedLocks {
    fn lock_for(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(key.to_string()).or_default())
    }
}
