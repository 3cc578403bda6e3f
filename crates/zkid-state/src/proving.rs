//! # Proving Session State Machine
//!
//! ```text
//! idle ─FETCH_DATA→ fetching_data ─FETCH_SUCCESS→ validating_document
//!                        │                            │
//!                   FETCH_ERROR                       ├─VALIDATION_SUCCESS→ init_tee_connexion
//!                        ↓                            ├─ALREADY_REGISTERED→ completed*
//!                     error*                          ├─PASSPORT_NOT_SUPPORTED→ passport_not_supported*
//!                                                     ├─ACCOUNT_RECOVERY_CHOICE→ account_recovery_choice*
//!                                                     ├─PASSPORT_DATA_NOT_FOUND→ passport_data_not_found*
//!                                                     └─VALIDATION_ERROR→ error*
//!
//! init_tee_connexion ─CONNECT_SUCCESS→ ready_to_prove ─START_PROVING→ proving
//!         └─CONNECT_ERROR→ error*                                       │
//!                                         ┌─────────PROVE_SUCCESS───────┤
//!                                         ↓                             ├─PROVE_ERROR→ error*
//!                                    post_proving                       └─PROVE_FAILURE→ failure*
//!                                         ├─SWITCH_TO_REGISTER→ fetching_data
//!                                         └─COMPLETED→ completed*
//! ```
//!
//! Any other (state, event) pair leaves the machine where it is and returns
//! [`Transition::Ignored`]. Error-carrying events record their details in
//! [`ProvingMachine::last_error`] when they are accepted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session state. `*` states in the module diagram are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvingState {
    Idle,
    FetchingData,
    ValidatingDocument,
    InitTeeConnexion,
    ReadyToProve,
    Proving,
    PostProving,
    Completed,
    Error,
    Failure,
    PassportNotSupported,
    AccountRecoveryChoice,
    PassportDataNotFound,
}

impl ProvingState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::FetchingData => "fetching_data",
            Self::ValidatingDocument => "validating_document",
            Self::InitTeeConnexion => "init_tee_connexion",
            Self::ReadyToProve => "ready_to_prove",
            Self::Proving => "proving",
            Self::PostProving => "post_proving",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Failure => "failure",
            Self::PassportNotSupported => "passport_not_supported",
            Self::AccountRecoveryChoice => "account_recovery_choice",
            Self::PassportDataNotFound => "passport_data_not_found",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed
                | Self::Error
                | Self::Failure
                | Self::PassportNotSupported
                | Self::AccountRecoveryChoice
                | Self::PassportDataNotFound
        )
    }
}

impl std::fmt::Display for ProvingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Inputs to the machine. Error events carry what went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProvingEvent {
    FetchData,
    FetchSuccess,
    FetchError {
        reason: String,
    },
    ValidationSuccess,
    AlreadyRegistered,
    PassportNotSupported {
        reason: String,
    },
    AccountRecoveryChoice,
    PassportDataNotFound,
    ValidationError {
        reason: String,
    },
    ConnectSuccess,
    ConnectError {
        reason: String,
    },
    StartProving,
    ProveSuccess,
    ProveError {
        reason: String,
    },
    ProveFailure {
        error_code: Option<String>,
        reason: Option<String>,
    },
    SwitchToRegister,
    Completed,
}

impl ProvingEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::FetchData => "FETCH_DATA",
            Self::FetchSuccess => "FETCH_SUCCESS",
            Self::FetchError { .. } => "FETCH_ERROR",
            Self::ValidationSuccess => "VALIDATION_SUCCESS",
            Self::AlreadyRegistered => "ALREADY_REGISTERED",
            Self::PassportNotSupported { .. } => "PASSPORT_NOT_SUPPORTED",
            Self::AccountRecoveryChoice => "ACCOUNT_RECOVERY_CHOICE",
            Self::PassportDataNotFound => "PASSPORT_DATA_NOT_FOUND",
            Self::ValidationError { .. } => "VALIDATION_ERROR",
            Self::ConnectSuccess => "CONNECT_SUCCESS",
            Self::ConnectError { .. } => "CONNECT_ERROR",
            Self::StartProving => "START_PROVING",
            Self::ProveSuccess => "PROVE_SUCCESS",
            Self::ProveError { .. } => "PROVE_ERROR",
            Self::ProveFailure { .. } => "PROVE_FAILURE",
            Self::SwitchToRegister => "SWITCH_TO_REGISTER",
            Self::Completed => "COMPLETED",
        }
    }

    fn error_info(&self) -> Option<ErrorInfo> {
        let info = match self {
            Self::FetchError { reason }
            | Self::ValidationError { reason }
            | Self::ConnectError { reason }
            | Self::ProveError { reason }
            | Self::PassportNotSupported { reason } => ErrorInfo {
                code: None,
                reason: Some(reason.clone()),
            },
            Self::ProveFailure { error_code, reason } => ErrorInfo {
                code: error_code.clone(),
                reason: reason.clone(),
            },
            _ => return None,
        };
        Some(info)
    }
}

impl std::fmt::Display for ProvingEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Error details of the last accepted error event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: Option<String>,
    pub reason: Option<String>,
}

/// One accepted transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from_state: ProvingState,
    pub to_state: ProvingState,
    pub event: String,
    pub timestamp: DateTime<Utc>,
}

/// Result of feeding an event to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Moved {
        from: ProvingState,
        to: ProvingState,
    },
    Ignored {
        state: ProvingState,
        event: &'static str,
    },
}

impl Transition {
    /// The state entered, if the event was accepted.
    pub fn entered(&self) -> Option<ProvingState> {
        match self {
            Self::Moved { to, .. } => Some(*to),
            Self::Ignored { .. } => None,
        }
    }
}

fn next_state(state: ProvingState, event: &ProvingEvent) -> Option<ProvingState> {
    use ProvingEvent as E;
    use ProvingState as S;
    let next = match (state, event) {
        (S::Idle, E::FetchData) => S::FetchingData,
        (S::FetchingData, E::FetchSuccess) => S::ValidatingDocument,
        (S::FetchingData, E::FetchError { .. }) => S::Error,
        (S::ValidatingDocument, E::ValidationSuccess) => S::InitTeeConnexion,
        (S::ValidatingDocument, E::AlreadyRegistered) => S::Completed,
        (S::ValidatingDocument, E::PassportNotSupported { .. }) => S::PassportNotSupported,
        (S::ValidatingDocument, E::AccountRecoveryChoice) => S::AccountRecoveryChoice,
        (S::ValidatingDocument, E::PassportDataNotFound) => S::PassportDataNotFound,
        (S::ValidatingDocument, E::ValidationError { .. }) => S::Error,
        (S::InitTeeConnexion, E::ConnectSuccess) => S::ReadyToProve,
        (S::InitTeeConnexion, E::ConnectError { .. }) => S::Error,
        (S::ReadyToProve, E::StartProving) => S::Proving,
        (S::Proving, E::ProveSuccess) => S::PostProving,
        (S::Proving, E::ProveError { .. }) => S::Error,
        (S::Proving, E::ProveFailure { .. }) => S::Failure,
        (S::PostProving, E::SwitchToRegister) => S::FetchingData,
        (S::PostProving, E::Completed) => S::Completed,
        _ => return None,
    };
    Some(next)
}

/// The proving lifecycle of one session.
#[derive(Debug, Clone)]
pub struct ProvingMachine {
    state: ProvingState,
    transition_log: Vec<TransitionRecord>,
    last_error: Option<ErrorInfo>,
}

impl Default for ProvingMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ProvingMachine {
    /// A machine in `idle`.
    pub fn new() -> Self {
        Self {
            state: ProvingState::Idle,
            transition_log: Vec::new(),
            last_error: None,
        }
    }

    pub fn state(&self) -> ProvingState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn transition_log(&self) -> &[TransitionRecord] {
        &self.transition_log
    }

    pub fn last_error(&self) -> Option<&ErrorInfo> {
        self.last_error.as_ref()
    }

    /// Feed `event`. Unhandled pairs leave the state unchanged.
    pub fn send(&mut self, event: ProvingEvent) -> Transition {
        let Some(to) = next_state(self.state, &event) else {
            return Transition::Ignored {
                state: self.state,
                event: event.name(),
            };
        };
        if let Some(info) = event.error_info() {
            self.last_error = Some(info);
        }
        let from = self.state;
        self.transition_log.push(TransitionRecord {
            from_state: from,
            to_state: to,
            event: event.name().to_string(),
            timestamp: Utc::now(),
        });
        self.state = to;
        Transition::Moved { from, to }
    }
}
