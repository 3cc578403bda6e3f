//! Proving session state, owned by the session actor, and the snapshot it
//! publishes to observers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use zkid_client::FetchedData;
use zkid_core::{CircuitType, DocumentCategory, DocumentData, Environment, ProofKind, SessionId};
use zkid_state::{ChannelState, ErrorInfo, ProvingMachine, ProvingState, TransitionRecord};

use crate::channel::SecureChannel;
use crate::payload::DisclosureRequest;

/// What to prove, supplied to `ProvingOrchestrator::init`.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub circuit_type: CircuitType,
    pub document: Arc<DocumentData>,
    pub disclosure: Option<DisclosureRequest>,
    /// Start proving without waiting for `set_user_confirmed`.
    pub user_confirmed: bool,
}

impl SessionRequest {
    pub fn register(document: Arc<DocumentData>) -> Self {
        Self::new(CircuitType::Register, document)
    }

    pub fn dsc(document: Arc<DocumentData>) -> Self {
        Self::new(CircuitType::Dsc, document)
    }

    pub fn disclose(document: Arc<DocumentData>, request: DisclosureRequest) -> Self {
        Self {
            disclosure: Some(request),
            ..Self::new(CircuitType::Disclose, document)
        }
    }

    fn new(circuit_type: CircuitType, document: Arc<DocumentData>) -> Self {
        Self {
            circuit_type,
            document,
            disclosure: None,
            user_confirmed: false,
        }
    }

    pub fn confirmed(mut self) -> Self {
        self.user_confirmed = true;
        self
    }
}

/// A consistent view of the session after each step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvingSnapshot {
    pub session_id: SessionId,
    pub circuit_type: CircuitType,
    pub document_category: DocumentCategory,
    pub environment: Environment,
    pub state: ProvingState,
    pub user_confirmed: bool,
    pub error: Option<ErrorInfo>,
    pub channel_state: Option<ChannelState>,
    pub request_id: Option<String>,
    /// PEM of the alternative CSCA the document turned out to be registered
    /// under, for the application to store with the document.
    pub matched_csca_pem: Option<String>,
    pub transitions: Vec<TransitionRecord>,
}

impl ProvingSnapshot {
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

#[derive(Debug)]
pub struct ProvingSession {
    pub session_id: SessionId,
    pub circuit_type: CircuitType,
    pub machine: ProvingMachine,
    pub environment: Environment,
    pub document: Arc<DocumentData>,
    pub disclosure: Option<DisclosureRequest>,
    pub fetched: Option<Arc<FetchedData>>,
    pub channel: Option<SecureChannel>,
    pub channel_state: Option<ChannelState>,
    pub request_id: Option<String>,
    pub user_confirmed: bool,
    pub matched_csca_pem: Option<String>,
}

impl ProvingSession {
    pub fn new(request: SessionRequest, environment: Environment) -> Self {
        Self {
            session_id: SessionId::new(),
            circuit_type: request.circuit_type,
            machine: ProvingMachine::new(),
            environment,
            document: request.document,
            disclosure: request.disclosure,
            fetched: None,
            channel: None,
            channel_state: None,
            request_id: None,
            user_confirmed: request.user_confirmed,
            matched_csca_pem: None,
        }
    }

    pub fn kind(&self) -> ProofKind {
        ProofKind::new(self.circuit_type, self.document.document_category)
    }

    /// Reset per-stage fields for the register proof that follows a DSC
    /// proof. The user already confirmed the chain.
    pub fn start_register_stage(&mut self) {
        self.session_id = SessionId::new();
        self.circuit_type = CircuitType::Register;
        self.user_confirmed = true;
        self.fetched = None;
        self.channel = None;
        self.channel_state = None;
        self.request_id = None;
    }

    pub fn snapshot(&self) -> ProvingSnapshot {
        ProvingSnapshot {
            session_id: self.session_id,
            circuit_type: self.circuit_type,
            document_category: self.document.document_category,
            environment: self.environment,
            state: self.machine.state(),
            user_confirmed: self.user_confirmed,
            error: self.machine.last_error().cloned(),
            channel_state: self.channel_state,
            request_id: self.request_id.clone(),
            matched_csca_pem: self.matched_csca_pem.clone(),
            transitions: self.machine.transition_log().to_vec(),
        }
    }
}
