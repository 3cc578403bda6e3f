//! # zkid-prover — Proving Session Orchestration
//!
//! Turns a parsed identity document into a submitted, remotely verified
//! zero-knowledge proof:
//!
//! 1. fetch trees and circuit metadata ([`zkid_client`]);
//! 2. validate support and registration ([`zkid_eligibility`]);
//! 3. open an attested, encrypted channel to the proving TEE ([`channel`]);
//! 4. submit the sealed proof request ([`payload`], [`protocol`]);
//! 5. follow the proof status until it is final ([`status`]).
//!
//! [`ProvingOrchestrator`] sequences these steps with the proving state
//! machine from `zkid-state`. Everything outside the protocol (secret
//! storage, circuit inputs, proof history, network transports) comes in
//! through the traits in [`collaborators`] and [`transport`].

pub mod channel;
pub mod collaborators;
pub mod config;
pub mod orchestrator;
pub mod payload;
pub mod protocol;
pub mod session;
pub mod status;
pub mod transport;

pub use channel::{ChannelError, SecureChannel};
pub use collaborators::{
    CircuitInputGenerator, CollaboratorError, InputRequest, LogRecorder, ProofRecord,
    ProofRecorder, SecretProvider,
};
pub use config::ProverConfig;
pub use orchestrator::{ProverDeps, ProvingOrchestrator};
pub use payload::{CircuitPayload, DisclosureRequest, PayloadError, ProofPayload};
pub use session::{ProvingSession, ProvingSnapshot, SessionRequest};
pub use status::{StatusError, StatusListener, StatusUpdate};
pub use transport::{Connector, MessageTransport, TransportError, WebSocketConnector};
