//! WebSocket transport over `tokio-tungstenite` (rustls, webpki roots).

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::{Connector, MessageTransport, TransportError};

/// Connects with `tokio_tungstenite::connect_async`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn MessageTransport>, TransportError> {
        let (stream, response) = connect_async(url).await.map_err(|e| TransportError::Connect {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        tracing::debug!(url, status = response.status().as_u16(), "websocket connected");
        Ok(Box::new(WebSocketTransport { stream }))
    }
}

pub struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl MessageTransport for WebSocketTransport {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        while let Some(frame) = self.stream.next().await {
            match frame.map_err(|e| TransportError::Io(e.to_string()))? {
                Message::Text(text) => return Ok(Some(text)),
                Message::Binary(bytes) => {
                    let text = String::from_utf8(bytes)
                        .map_err(|_| TransportError::Io("binary frame is not UTF-8".into()))?;
                    return Ok(Some(text));
                }
                Message::Close(_) => return Ok(None),
                // Control frames are answered by tungstenite itself.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
        Ok(None)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.stream
            .close(None)
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }
}
