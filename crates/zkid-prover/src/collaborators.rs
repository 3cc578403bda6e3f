//! # Collaborator Interfaces
//!
//! Capabilities the orchestrator consumes but does not implement: the
//! holder's secret store, circuit input generation, and proof history.
//! The embedding application provides implementations; tests use in-memory
//! ones.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use zkid_client::FetchedData;
use zkid_core::{CircuitType, DocumentCategory, DocumentData, Environment, ProofKind, SessionId};
use zkid_crypto::UserSecret;
use zkid_state::{ErrorInfo, ProvingState};

use crate::payload::DisclosureRequest;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    #[error("secret store unavailable: {0}")]
    SecretUnavailable(String),
    #[error("circuit input generation failed: {0}")]
    InputGeneration(String),
    #[error("proof history write failed: {0}")]
    Storage(String),
}

/// Secure storage of the holder's secret.
#[async_trait]
pub trait SecretProvider: Send + Sync {
    /// The stored secret, creating and persisting one on first use.
    async fn get_or_create_secret(&self) -> Result<UserSecret, CollaboratorError>;
}

/// Everything needed to build a circuit's witness inputs.
pub struct InputRequest<'a> {
    pub kind: ProofKind,
    pub circuit_name: &'a str,
    pub document: &'a DocumentData,
    pub secret: &'a UserSecret,
    pub fetched: &'a FetchedData,
    pub disclosure: Option<&'a DisclosureRequest>,
}

/// Produces circuit inputs as JSON.
#[async_trait]
pub trait CircuitInputGenerator: Send + Sync {
    async fn generate(&self, request: InputRequest<'_>) -> Result<serde_json::Value, CollaboratorError>;
}

/// Terminal outcome of one proving stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRecord {
    pub session_id: SessionId,
    pub circuit_type: CircuitType,
    pub document_category: DocumentCategory,
    pub environment: Environment,
    pub state: ProvingState,
    pub error: Option<ErrorInfo>,
    pub request_id: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Local proof history.
#[async_trait]
pub trait ProofRecorder: Send + Sync {
    async fn record(&self, record: ProofRecord) -> Result<(), CollaboratorError>;
}

/// A recorder that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRecorder;

#[async_trait]
impl ProofRecorder for LogRecorder {
    async fn record(&self, record: ProofRecord) -> Result<(), CollaboratorError> {
        tracing::info!(
            session = %record.session_id,
            circuit = %record.circuit_type,
            state = %record.state,
            "proof outcome"
        );
        Ok(())
    }
}
