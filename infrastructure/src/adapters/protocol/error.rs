//! Error types for the protocol client

use thiserror::Error;

/// Result type alias for protocol client operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors that can occur when talking to a JSON-RPC tool server
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("JSON-RPC error (code {code}): {message}")]
    Rpc { code: i64, message: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Transport closed")]
    TransportClosed,

    #[error("Request timed out after {0}ms")]
    Timeout(u128),
}

impl ProtocolError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProtocolError::Timeout(_))
    }
}
