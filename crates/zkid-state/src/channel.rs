//! # Secure Channel Lifecycle
//!
//! Runtime-checked handshake states for the TEE channel:
//!
//! ```text
//! Idle → KeyExchangeSent → Verified → Ready
//!   └──────────┴──────────────┴─────────┴──→ Closed
//! ```
//!
//! `KeyExchangeSent` means the hello with our ephemeral key is on the wire;
//! `Verified` means the attestation checked out and the shared key exists;
//! `Ready` means the channel may encrypt and submit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use zkid_core::StateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelState {
    Idle,
    KeyExchangeSent,
    Verified,
    Ready,
    Closed,
}

impl ChannelState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::KeyExchangeSent => "KEY_EXCHANGE_SENT",
            Self::Verified => "VERIFIED",
            Self::Ready => "READY",
            Self::Closed => "CLOSED",
        }
    }
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Channel state plus the log of accepted transitions.
#[derive(Debug, Clone)]
pub struct ChannelLifecycle {
    state: ChannelState,
    transition_log: Vec<(ChannelState, ChannelState, DateTime<Utc>)>,
}

impl Default for ChannelLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelLifecycle {
    pub fn new() -> Self {
        Self {
            state: ChannelState::Idle,
            transition_log: Vec::new(),
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == ChannelState::Closed
    }

    pub fn transition_log(&self) -> &[(ChannelState, ChannelState, DateTime<Utc>)] {
        &self.transition_log
    }

    /// Move to `to`, or fail with `StateError::InvalidTransition`.
    pub fn try_transition(&mut self, to: ChannelState) -> Result<(), StateError> {
        use ChannelState::*;
        let valid = matches!(
            (self.state, to),
            (Idle, KeyExchangeSent) | (KeyExchangeSent, Verified) | (Verified, Ready)
        ) || (to == Closed && self.state != Closed);

        if !valid {
            return Err(StateError::InvalidTransition {
                from: self.state.name().to_string(),
                to: to.name().to_string(),
                reason: "not permitted by the channel handshake".to_string(),
            });
        }
        self.transition_log.push((self.state, to, Utc::now()));
        self.state = to;
        Ok(())
    }
}
