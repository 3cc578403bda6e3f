//! # Socket.IO over Engine.IO v4
//!
//! The minimal client side of the protocol, enough to subscribe to a room
//! and receive events on the default namespace:
//!
//! ```text
//! server: 0{"sid":..,"pingInterval":..}      engine open
//! client: 40                                  socket connect
//! server: 40{"sid":..}                        socket connect ack
//! client: 42["subscribe","<uuid>"]            event
//! server: 42["status",{...}]                  event
//! server: 2        client: 3                  ping / pong
//! ```
//!
//! Binary attachments and namespaces other than `/` are not supported.

use serde_json::Value;
use url::Url;

use super::{Connector, MessageTransport, TransportError};

/// One decoded Engine.IO frame.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineFrame {
    Open(Value),
    Close,
    Ping,
    Pong,
    Message(SocketFrame),
    Upgrade,
    Noop,
}

/// One decoded Socket.IO packet (payload of an Engine.IO message).
#[derive(Debug, Clone, PartialEq)]
pub enum SocketFrame {
    Connect(Option<Value>),
    Disconnect,
    Event { name: String, args: Vec<Value> },
    Ack(Vec<Value>),
    ConnectError(Option<Value>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SocketIoError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("malformed frame {frame:?}: {reason}")]
    Malformed { frame: String, reason: String },
    #[error("server refused connection: {0}")]
    Refused(String),
    #[error("connection closed during handshake")]
    HandshakeClosed,
}

fn malformed(frame: &str, reason: impl Into<String>) -> SocketIoError {
    SocketIoError::Malformed {
        frame: frame.to_string(),
        reason: reason.into(),
    }
}

/// Decode one Engine.IO text frame.
pub fn decode(frame: &str) -> Result<EngineFrame, SocketIoError> {
    let mut chars = frame.chars();
    let kind = chars.next().ok_or_else(|| malformed(frame, "empty frame"))?;
    let rest = chars.as_str();
    match kind {
        '0' => {
            let handshake = if rest.is_empty() {
                Value::Null
            } else {
                serde_json::from_str(rest).map_err(|e| malformed(frame, e.to_string()))?
            };
            Ok(EngineFrame::Open(handshake))
        }
        '1' => Ok(EngineFrame::Close),
        '2' => Ok(EngineFrame::Ping),
        '3' => Ok(EngineFrame::Pong),
        '4' => decode_packet(rest).map(EngineFrame::Message),
        '5' => Ok(EngineFrame::Upgrade),
        '6' => Ok(EngineFrame::Noop),
        other => Err(malformed(frame, format!("unknown engine packet type {other}"))),
    }
}

fn decode_packet(packet: &str) -> Result<SocketFrame, SocketIoError> {
    let mut chars = packet.chars();
    let kind = chars.next().ok_or_else(|| malformed(packet, "empty packet"))?;
    // Skip an optional ack id before the JSON payload.
    let body = chars.as_str().trim_start_matches(|c: char| c.is_ascii_digit());
    let payload = || -> Result<Option<Value>, SocketIoError> {
        if body.is_empty() {
            Ok(None)
        } else {
            serde_json::from_str(body)
                .map(Some)
                .map_err(|e| malformed(packet, e.to_string()))
        }
    };
    match kind {
        '0' => Ok(SocketFrame::Connect(payload()?)),
        '1' => Ok(SocketFrame::Disconnect),
        '2' => {
            let Some(Value::Array(mut items)) = payload()? else {
                return Err(malformed(packet, "event payload is not an array"));
            };
            if items.is_empty() {
                return Err(malformed(packet, "event without a name"));
            }
            let Value::String(name) = items.remove(0) else {
                return Err(malformed(packet, "event name is not a string"));
            };
            Ok(SocketFrame::Event { name, args: items })
        }
        '3' => match payload()? {
            Some(Value::Array(items)) => Ok(SocketFrame::Ack(items)),
            _ => Ok(SocketFrame::Ack(Vec::new())),
        },
        '4' => Ok(SocketFrame::ConnectError(payload()?)),
        other => Err(malformed(packet, format!("unsupported socket packet type {other}"))),
    }
}

/// Encode an event on the default namespace.
pub fn encode_event(name: &str, args: &[Value]) -> String {
    let mut items = Vec::with_capacity(args.len() + 1);
    items.push(Value::String(name.to_string()));
    items.extend(args.iter().cloned());
    format!("42{}", Value::Array(items))
}

/// WebSocket URL of the Socket.IO endpoint under `base`.
pub fn socket_io_url(base: &Url) -> String {
    format!(
        "{}/socket.io/?EIO=4&transport=websocket",
        base.as_str().trim_end_matches('/')
    )
}

/// A connected Socket.IO client on the default namespace.
pub struct SocketIoClient {
    transport: Box<dyn MessageTransport>,
}

impl SocketIoClient {
    /// Open the transport and complete the Engine.IO and Socket.IO handshakes.
    pub async fn connect(connector: &dyn Connector, base: &Url) -> Result<Self, SocketIoError> {
        let transport = connector.connect(&socket_io_url(base)).await?;
        let mut client = Self { transport };
        client.handshake().await?;
        Ok(client)
    }

    async fn handshake(&mut self) -> Result<(), SocketIoError> {
        let mut opened = false;
        loop {
            let Some(text) = self.transport.recv().await? else {
                return Err(SocketIoError::HandshakeClosed);
            };
            match decode(&text)? {
                EngineFrame::Open(_) if !opened => {
                    opened = true;
                    self.transport.send("40".into()).await?;
                }
                EngineFrame::Ping => self.transport.send("3".into()).await?,
                EngineFrame::Message(SocketFrame::Connect(_)) if opened => return Ok(()),
                EngineFrame::Message(SocketFrame::ConnectError(reason)) => {
                    return Err(SocketIoError::Refused(
                        reason.map(|r| r.to_string()).unwrap_or_default(),
                    ));
                }
                EngineFrame::Close => return Err(SocketIoError::HandshakeClosed),
                other => tracing::debug!(frame = ?other, "ignoring frame during handshake"),
            }
        }
    }

    pub async fn emit(&mut self, name: &str, args: &[Value]) -> Result<(), SocketIoError> {
        self.transport.send(encode_event(name, args)).await?;
        Ok(())
    }

    /// Next event, answering pings along the way. `None` once disconnected.
    pub async fn next_event(&mut self) -> Result<Option<(String, Vec<Value>)>, SocketIoError> {
        loop {
            let Some(text) = self.transport.recv().await? else {
                return Ok(None);
            };
            match decode(&text) {
                Ok(EngineFrame::Ping) => self.transport.send("3".into()).await?,
                Ok(EngineFrame::Message(SocketFrame::Event { name, args })) => {
                    return Ok(Some((name, args)))
                }
                Ok(EngineFrame::Close) | Ok(EngineFrame::Message(SocketFrame::Disconnect)) => {
                    return Ok(None)
                }
                Ok(other) => tracing::debug!(frame = ?other, "ignoring frame"),
                Err(e) => tracing::warn!(error = %e, "dropping malformed socket.io frame"),
            }
        }
    }

    /// Leave the namespace and close the transport.
    pub async fn close(mut self) -> Result<(), SocketIoError> {
        // The peer may already be gone; closing the transport is what matters.
        let _ = self.transport.send("41".into()).await;
        self.transport.close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_open_and_control_frames() {
        assert_eq!(
            decode(r#"0{"sid":"abc","pingInterval":25000}"#).unwrap(),
            EngineFrame::Open(json!({"sid": "abc", "pingInterval": 25000}))
        );
        assert_eq!(decode("2").unwrap(), EngineFrame::Ping);
        assert_eq!(decode("3").unwrap(), EngineFrame::Pong);
        assert_eq!(decode("1").unwrap(), EngineFrame::Close);
        assert!(decode("").is_err());
        assert!(decode("9").is_err());
    }

    #[test]
    fn test_decode_connect_and_event() {
        assert_eq!(
            decode(r#"40{"sid":"xyz"}"#).unwrap(),
            EngineFrame::Message(SocketFrame::Connect(Some(json!({"sid": "xyz"}))))
        );
        assert_eq!(
            decode("40").unwrap(),
            EngineFrame::Message(SocketFrame::Connect(None))
        );
        assert_eq!(
            decode(r#"42["status",{"status":4}]"#).unwrap(),
            EngineFrame::Message(SocketFrame::Event {
                name: "status".into(),
                args: vec![json!({"status": 4})],
            })
        );
    }

    #[test]
    fn test_decode_event_with_ack_id() {
        assert_eq!(
            decode(r#"4212["status","x"]"#).unwrap(),
            EngineFrame::Message(SocketFrame::Event {
                name: "status".into(),
                args: vec![json!("x")],
            })
        );
    }

    #[test]
    fn test_decode_rejects_bad_events() {
        assert!(decode("42{}").is_err());
        assert!(decode("42[]").is_err());
        assert!(decode("42[1,2]").is_err());
        assert!(decode("42[not json").is_err());
    }

    #[test]
    fn test_encode_event() {
        assert_eq!(
            encode_event("subscribe", &[json!("4a1c")]),
            r#"42["subscribe","4a1c"]"#
        );
    }

    #[test]
    fn test_socket_io_url() {
        let base = Url::parse("wss://status.example/").unwrap();
        assert_eq!(
            socket_io_url(&base),
            "wss://status.example/socket.io/?EIO=4&transport=websocket"
        );
    }
}
