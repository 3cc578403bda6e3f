//! # Message Transports
//!
//! Both remote parties speak text frames over WebSocket: JSON-RPC for the
//! TEE, Engine.IO/Socket.IO for the status service. The orchestrator only
//! depends on [`Connector`] and [`MessageTransport`], so tests can script
//! either party in memory.

pub mod socketio;
pub mod websocket;

use async_trait::async_trait;

pub use websocket::{WebSocketConnector, WebSocketTransport};

/// Errors from the underlying connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },
    #[error("transport I/O error: {0}")]
    Io(String),
    #[error("transport already closed")]
    Closed,
}

/// A bidirectional stream of text frames.
#[async_trait]
pub trait MessageTransport: Send {
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Next text frame, or `None` once the peer closed the connection.
    async fn recv(&mut self) -> Result<Option<String>, TransportError>;

    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Opens transports to a URL.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn MessageTransport>, TransportError>;
}
