//! # Secure Channel to the Proving TEE
//!
//! ## Design
//!
//! [`SecureChannel::open`] runs the whole handshake:
//!
//! 1. generate an ephemeral P-256 key pair and connect the transport;
//! 2. send `openpassport_hello` with the public key and session UUID
//!    (`KeyExchangeSent`);
//! 3. receive the attestation, verify it with the configured
//!    [`AttestationVerifier`], derive the AES key from the attested server
//!    key (`Verified`), then mark the channel `Ready`.
//!
//! [`SecureChannel::submit`] seals a [`ProofPayload`], sends it and waits for
//! the TEE to acknowledge with the request UUID.
//!
//! ## Security Invariant
//!
//! No key is derived from an unverified attestation, and the ephemeral secret
//! is consumed by the one derivation a channel performs. `close` drops the
//! shared key, which zeroizes it.

use serde::Serialize;

use zkid_core::{CryptoError, SessionId, StateError};
use zkid_crypto::{AttestationVerifier, EncryptedEnvelope, EphemeralKeyPair, SharedKey};
use zkid_state::{ChannelLifecycle, ChannelState};

use crate::payload::ProofPayload;
use crate::protocol::{self, AttestationResult, RpcResponse, HELLO_ID, SUBMIT_ID};
use crate::transport::{Connector, MessageTransport, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("TEE closed the connection while waiting for response {0}")]
    ConnectionClosed(u64),
    #[error("malformed TEE message: {0}")]
    Protocol(String),
    #[error("TEE returned error (code {code:?}): {message}")]
    Rpc { code: Option<i64>, message: String },
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

pub struct SecureChannel {
    session_id: SessionId,
    lifecycle: ChannelLifecycle,
    keys: EphemeralKeyPair,
    shared_key: Option<SharedKey>,
    transport: Option<Box<dyn MessageTransport>>,
}

impl std::fmt::Debug for SecureChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureChannel")
            .field("session_id", &self.session_id)
            .field("state", &self.lifecycle.state())
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

impl SecureChannel {
    /// Connect to `url` and complete the attested key exchange.
    pub async fn open(
        connector: &dyn Connector,
        url: &str,
        session_id: SessionId,
        verifier: &dyn AttestationVerifier,
    ) -> Result<Self, ChannelError> {
        let transport = connector.connect(url).await?;
        let mut channel = Self {
            session_id,
            lifecycle: ChannelLifecycle::new(),
            keys: EphemeralKeyPair::generate(),
            shared_key: None,
            transport: Some(transport),
        };
        match channel.handshake(verifier).await {
            Ok(()) => Ok(channel),
            Err(e) => {
                channel.close().await;
                Err(e)
            }
        }
    }

    async fn handshake(&mut self, verifier: &dyn AttestationVerifier) -> Result<(), ChannelError> {
        let hello = protocol::hello(self.keys.public_key_bytes(), self.session_id);
        self.send(&hello).await?;
        self.lifecycle.try_transition(ChannelState::KeyExchangeSent)?;

        let result = self.await_result(HELLO_ID).await?;
        let AttestationResult { attestation } = serde_json::from_value(result)
            .map_err(|e| ChannelError::Protocol(format!("hello result: {e}")))?;
        let verified = verifier.verify(&attestation)?;
        self.shared_key = Some(self.keys.derive_shared_key(&verified.public_key)?);
        self.lifecycle.try_transition(ChannelState::Verified)?;
        tracing::debug!(
            session = %self.session_id,
            measurement = %hex_prefix(&verified.measurement),
            "TEE attestation verified"
        );
        self.lifecycle.try_transition(ChannelState::Ready)?;
        Ok(())
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn state(&self) -> ChannelState {
        self.lifecycle.state()
    }

    pub fn lifecycle(&self) -> &ChannelLifecycle {
        &self.lifecycle
    }

    /// Seal `plaintext` under the session key. Only valid once `Ready`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedEnvelope, ChannelError> {
        let key = match (&self.shared_key, self.lifecycle.state()) {
            (Some(key), ChannelState::Ready) => key,
            (_, state) => {
                return Err(StateError::InvalidTransition {
                    from: state.name().to_string(),
                    to: "ENCRYPT".to_string(),
                    reason: "channel is not ready".to_string(),
                }
                .into())
            }
        };
        Ok(key.seal(plaintext)?)
    }

    /// Encrypt and submit `payload`; returns the TEE's request UUID.
    pub async fn submit(&mut self, payload: &ProofPayload) -> Result<String, ChannelError> {
        let plaintext = serde_json::to_vec(payload)?;
        let envelope = self.encrypt(&plaintext)?;
        self.send(&protocol::submit(self.session_id, &envelope)).await?;
        let result = self.await_result(SUBMIT_ID).await?;
        match result {
            serde_json::Value::String(request_id) => Ok(request_id),
            other => Err(ChannelError::Protocol(format!(
                "submit result is not a request id: {other}"
            ))),
        }
    }

    /// Close the transport and drop the session key. Idempotent.
    pub async fn close(&mut self) {
        self.shared_key = None;
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                tracing::debug!(session = %self.session_id, error = %e, "TEE transport close failed");
            }
        }
        if !self.lifecycle.is_closed() {
            // Closed is reachable from every other state.
            let _ = self.lifecycle.try_transition(ChannelState::Closed);
        }
    }

    async fn send<T: Serialize + Sync>(&mut self, message: &T) -> Result<(), ChannelError> {
        let text = serde_json::to_string(message)?;
        self.transport_mut()?.send(text).await?;
        Ok(())
    }

    /// Wait for the response with `id`, skipping unrelated frames.
    async fn await_result(&mut self, id: u64) -> Result<serde_json::Value, ChannelError> {
        loop {
            let Some(text) = self.transport_mut()?.recv().await? else {
                return Err(ChannelError::ConnectionClosed(id));
            };
            let response: RpcResponse = serde_json::from_str(&text)
                .map_err(|e| ChannelError::Protocol(format!("{e}: {text}")))?;
            if response.id.is_some_and(|got| got != id) {
                tracing::debug!(session = %self.session_id, expected = id, got = ?response.id, "skipping unrelated TEE response");
                continue;
            }
            if let Some(error) = response.error {
                return Err(ChannelError::Rpc {
                    code: error.code,
                    message: error.message,
                });
            }
            return response
                .result
                .ok_or_else(|| ChannelError::Protocol(format!("response {id} has no result")));
        }
    }

    fn transport_mut(&mut self) -> Result<&mut Box<dyn MessageTransport>, ChannelError> {
        self.transport
            .as_mut()
            .ok_or(ChannelError::Transport(TransportError::Closed))
    }
}

fn hex_prefix(bytes: &[u8]) -> String {
    bytes.iter().take(8).map(|b| format!("{b:02x}")).collect()
}
