//! # Proof Status Listener
//!
//! After submission the TEE generates the proof out of band. Progress is
//! published on the status service as Socket.IO `status` events for the
//! request UUID:
//!
//! | status | meaning              | outcome          |
//! |--------|----------------------|------------------|
//! | 0–2    | queued / generating  | ignored          |
//! | 3      | failed to generate   | `PROVE_FAILURE`  |
//! | 4      | proof verified       | `PROVE_SUCCESS`  |
//! | 5      | failed to verify     | `PROVE_FAILURE`  |
//!
//! The listener unsubscribes as soon as a terminal status arrives. A
//! disconnect before that is an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use zkid_state::ProvingEvent;

use crate::transport::socketio::{SocketIoClient, SocketIoError};
use crate::transport::Connector;

pub const STATUS_EVENT: &str = "status";
pub const SUBSCRIBE_EVENT: &str = "subscribe";

/// One `status` event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: u8,
    #[serde(default)]
    pub request_id: Option<String>,
    /// Machine-readable failure code; numbers and strings both arrive.
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub error_code: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

fn scalar_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(code)) => Ok(Some(code)),
        Some(scalar @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(scalar.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "error_code must be a scalar, got {other}"
        ))),
    }
}

impl StatusUpdate {
    /// Accept the payload as an object or as a JSON-encoded string.
    pub fn from_value(value: &Value) -> Result<Self, StatusError> {
        let parsed = match value {
            Value::String(text) => serde_json::from_str(text),
            other => serde_json::from_value(other.clone()),
        };
        parsed.map_err(|e| StatusError::Payload(e.to_string()))
    }

    /// The orchestrator event for this status, if it is terminal.
    pub fn outcome(&self) -> Option<ProvingEvent> {
        match self.status {
            3 | 5 => Some(ProvingEvent::ProveFailure {
                error_code: self.error_code.clone(),
                reason: self.reason.clone(),
            }),
            4 => Some(ProvingEvent::ProveSuccess),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatusError {
    #[error(transparent)]
    SocketIo(#[from] SocketIoError),
    #[error("malformed status payload: {0}")]
    Payload(String),
    #[error("status connection closed before a final status")]
    Disconnected,
}

/// Subscribes to the status of one request.
pub struct StatusListener<'a> {
    connector: &'a dyn Connector,
    base_url: &'a Url,
}

impl<'a> StatusListener<'a> {
    pub fn new(connector: &'a dyn Connector, base_url: &'a Url) -> Self {
        Self {
            connector,
            base_url,
        }
    }

    /// Listen until a terminal status for `request_id` arrives.
    ///
    /// Returns `PROVE_SUCCESS` or `PROVE_FAILURE`; disconnects and handshake
    /// failures are errors.
    pub async fn listen(&self, request_id: &str) -> Result<ProvingEvent, StatusError> {
        let mut client = SocketIoClient::connect(self.connector, self.base_url).await?;
        client
            .emit(SUBSCRIBE_EVENT, &[Value::String(request_id.to_string())])
            .await?;
        tracing::debug!(request_id, "subscribed to proof status");

        let outcome = self.await_terminal(&mut client, request_id).await;
        if let Err(e) = client.close().await {
            tracing::debug!(request_id, error = %e, "status socket close failed");
        }
        outcome
    }

    async fn await_terminal(
        &self,
        client: &mut SocketIoClient,
        request_id: &str,
    ) -> Result<ProvingEvent, StatusError> {
        while let Some((name, args)) = client.next_event().await? {
            if name != STATUS_EVENT {
                continue;
            }
            let Some(payload) = args.first() else {
                tracing::warn!(request_id, "status event without payload");
                continue;
            };
            let update = match StatusUpdate::from_value(payload) {
                Ok(update) => update,
                Err(e) => {
                    tracing::warn!(request_id, error = %e, "dropping malformed status event");
                    continue;
                }
            };
            if update
                .request_id
                .as_deref()
                .is_some_and(|id| id != request_id)
            {
                continue;
            }
            match update.outcome() {
                Some(event) => {
                    tracing::info!(request_id, status = update.status, "proof status final");
                    return Ok(event);
                }
                None => tracing::debug!(request_id, status = update.status, "proof status"),
            }
        }
        Err(StatusError::Disconnected)
    }
}
