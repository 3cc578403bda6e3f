//! # Proving Orchestrator
//!
//! Drives one proving session at a time through the proving state machine.
//!
//! ## Design
//!
//! Each session is owned by a single actor task, the only writer of its
//! [`ProvingSession`]. Remote I/O (fetching, validation lookups, the TEE
//! exchange, the status subscription) runs in child tasks held in a
//! `JoinSet`; they report back through an outcome queue that the actor
//! drains one message at a time. Callers reach the actor only through the
//! command queue (`set_user_confirmed`, teardown) and observe it through a
//! `watch` channel of [`ProvingSnapshot`]s.
//!
//! Entering a state runs its entry action. Actions either finish inline and
//! yield the next event, or spawn a child task whose outcome later becomes
//! the next event:
//!
//! | state               | entry action                                      |
//! |---------------------|---------------------------------------------------|
//! | fetching_data       | fetch trees, circuits, DNS mapping, alt. CSCAs     |
//! | validating_document | support check, registration, nullifier, DSC tree   |
//! | init_tee_connexion  | resolve TEE URL, open the attested channel         |
//! | ready_to_prove      | continue once the user confirmed                   |
//! | proving             | inputs, payload, submit, close channel, listen     |
//! | post_proving        | DSC proofs chain into a register proof             |
//! | terminal states     | close the channel, record the outcome              |
//!
//! ## Re-entrancy
//!
//! `init` stops the previous actor (children aborted and joined, channel
//! closed) before the new session starts, so at most one session is active.

use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::{JoinHandle, JoinSet};

use zkid_client::{fetch_all, FetchedData, ProviderError, RemoteDataProvider};
use zkid_core::{
    CircuitType, CryptoError, DocumentData, EndpointType, Environment, ProofKind, ZkidError,
};
use zkid_crypto::{compute_nullifier, AttestationVerifier};
use zkid_eligibility::{
    check_supported, circuit_name, is_dsc_in_tree, is_registered,
    is_registered_with_alternative_csca, EligibilityError,
};
use zkid_state::{ChannelState, ProvingEvent, ProvingState, Transition};

use crate::channel::{ChannelError, SecureChannel};
use crate::collaborators::{
    CircuitInputGenerator, CollaboratorError, InputRequest, ProofRecord, ProofRecorder,
    SecretProvider,
};
use crate::config::ProverConfig;
use crate::payload::{CircuitPayload, DisclosureRequest, PayloadError, ProofPayload};
use crate::session::{ProvingSession, ProvingSnapshot, SessionRequest};
use crate::status::{StatusError, StatusListener};
use crate::transport::Connector;

// ─── Dependencies ───────────────────────────────────────────────────────────

/// Collaborators and transports a session uses.
#[derive(Clone)]
pub struct ProverDeps {
    pub provider: Arc<dyn RemoteDataProvider>,
    pub secrets: Arc<dyn SecretProvider>,
    pub inputs: Arc<dyn CircuitInputGenerator>,
    pub recorder: Arc<dyn ProofRecorder>,
    pub tee_connector: Arc<dyn Connector>,
    pub status_connector: Arc<dyn Connector>,
    pub attestation: Arc<dyn AttestationVerifier>,
}

/// Failures inside a step, reported as the step's error event.
#[derive(Debug, thiserror::Error)]
enum StepError {
    #[error(transparent)]
    Eligibility(#[from] EligibilityError),
    #[error(transparent)]
    Core(#[from] ZkidError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error("failed to encode circuit inputs: {0}")]
    Inputs(#[from] serde_json::Error),
}

// ─── Actor Messages ─────────────────────────────────────────────────────────

enum Command {
    UserConfirmed,
    Shutdown,
}

struct Validation {
    event: ProvingEvent,
    matched_csca_pem: Option<String>,
    switch_to_register: bool,
}

impl Validation {
    fn event(event: ProvingEvent) -> Self {
        Self {
            event,
            matched_csca_pem: None,
            switch_to_register: false,
        }
    }
}

struct Submission {
    request_id: String,
    endpoint_type: EndpointType,
}

enum Outcome {
    Fetched(Result<FetchedData, ProviderError>),
    Validated(Result<Validation, StepError>),
    Connected(Result<SecureChannel, ChannelError>),
    Submitted(Result<Submission, StepError>),
    Status(Result<ProvingEvent, StatusError>),
}

/// The error event for a failure while in `state`, if the state has one.
fn failure_event(state: ProvingState, reason: String) -> Option<ProvingEvent> {
    match state {
        ProvingState::FetchingData => Some(ProvingEvent::FetchError { reason }),
        ProvingState::ValidatingDocument => Some(ProvingEvent::ValidationError { reason }),
        ProvingState::InitTeeConnexion => Some(ProvingEvent::ConnectError { reason }),
        ProvingState::Proving => Some(ProvingEvent::ProveError { reason }),
        _ => None,
    }
}

// ─── Orchestrator ───────────────────────────────────────────────────────────

struct ActiveSession {
    commands: mpsc::UnboundedSender<Command>,
    handle: JoinHandle<()>,
}

impl ActiveSession {
    async fn stop(self) {
        // A closed queue means the actor already exited.
        let _ = self.commands.send(Command::Shutdown);
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "session actor ended abnormally");
        }
    }
}

/// Entry point for proving sessions.
pub struct ProvingOrchestrator {
    config: Arc<ProverConfig>,
    deps: ProverDeps,
    snapshots: Arc<watch::Sender<Option<ProvingSnapshot>>>,
    active: Mutex<Option<ActiveSession>>,
}

impl ProvingOrchestrator {
    pub fn new(config: ProverConfig, deps: ProverDeps) -> Self {
        let (snapshots, _) = watch::channel(None);
        Self {
            config: Arc::new(config),
            deps,
            snapshots: Arc::new(snapshots),
            active: Mutex::new(None),
        }
    }

    /// Start a new session, tearing down the current one first.
    ///
    /// Must be called within a Tokio runtime.
    pub async fn init(&self, request: SessionRequest) {
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            previous.stop().await;
        }

        let environment = self.config.session_environment(request.document.is_mock);
        let session = ProvingSession::new(request, environment);
        tracing::info!(
            session = %session.session_id,
            circuit = %session.circuit_type,
            environment = %environment,
            "starting proving session"
        );

        let (command_tx, commands) = mpsc::unbounded_channel();
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        let actor = SessionActor {
            session,
            config: self.config.clone(),
            deps: self.deps.clone(),
            snapshots: self.snapshots.clone(),
            commands,
            outcomes_tx,
            outcomes_rx,
            tasks: JoinSet::new(),
            recorded: false,
        };
        actor.publish();
        *active = Some(ActiveSession {
            commands: command_tx,
            handle: tokio::spawn(actor.run()),
        });
    }

    /// Record the user's go-ahead. Proving starts once the channel is ready.
    pub async fn set_user_confirmed(&self) {
        if let Some(active) = self.active.lock().await.as_ref() {
            let _ = active.commands.send(Command::UserConfirmed);
        }
    }

    /// Stop the current session, if any.
    pub async fn shutdown(&self) {
        if let Some(active) = self.active.lock().await.take() {
            active.stop().await;
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<ProvingSnapshot>> {
        self.snapshots.subscribe()
    }

    /// The latest snapshot, `None` before the first `init`.
    pub fn snapshot(&self) -> Option<ProvingSnapshot> {
        self.snapshots.borrow().clone()
    }
}

// ─── Session Actor ──────────────────────────────────────────────────────────

struct SessionActor {
    session: ProvingSession,
    config: Arc<ProverConfig>,
    deps: ProverDeps,
    snapshots: Arc<watch::Sender<Option<ProvingSnapshot>>>,
    commands: mpsc::UnboundedReceiver<Command>,
    outcomes_tx: mpsc::UnboundedSender<Outcome>,
    outcomes_rx: mpsc::UnboundedReceiver<Outcome>,
    tasks: JoinSet<()>,
    recorded: bool,
}

impl SessionActor {
    async fn run(mut self) {
        self.dispatch(ProvingEvent::FetchData).await;
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::UserConfirmed) => self.confirm().await,
                    Some(Command::Shutdown) | None => break,
                },
                Some(outcome) = self.outcomes_rx.recv() => self.handle(outcome).await,
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            let state = self.session.machine.state();
                            tracing::error!(session = %self.session.session_id, state = %state, "session task panicked");
                            if let Some(event) = failure_event(state, "internal task failure".into()) {
                                self.dispatch(event).await;
                            }
                        }
                    }
                }
            }
        }
        self.teardown().await;
    }

    fn publish(&self) {
        self.snapshots.send_replace(Some(self.session.snapshot()));
    }

    /// Feed `event` and run entry actions until the machine settles.
    async fn dispatch(&mut self, event: ProvingEvent) {
        let mut next = Some(event);
        while let Some(event) = next.take() {
            let name = event.name();
            match self.session.machine.send(event) {
                Transition::Moved { from, to } => {
                    tracing::info!(
                        session = %self.session.session_id,
                        circuit = %self.session.circuit_type,
                        from = %from,
                        to = %to,
                        event = name,
                        "proving transition"
                    );
                    next = self.enter(to).await;
                }
                Transition::Ignored { state, event } => {
                    tracing::debug!(
                        session = %self.session.session_id,
                        state = %state,
                        event,
                        "event ignored in current state"
                    );
                }
            }
            self.publish();
        }
    }

    async fn enter(&mut self, state: ProvingState) -> Option<ProvingEvent> {
        match state {
            ProvingState::FetchingData => {
                self.spawn_fetch();
                None
            }
            ProvingState::ValidatingDocument => self.spawn_validation(),
            ProvingState::InitTeeConnexion => self.spawn_connect(),
            ProvingState::ReadyToProve => self
                .session
                .user_confirmed
                .then_some(ProvingEvent::StartProving),
            ProvingState::Proving => self.spawn_prove(),
            ProvingState::PostProving => Some(self.finish_stage()),
            terminal if terminal.is_terminal() => {
                self.finalize(terminal).await;
                None
            }
            _ => None,
        }
    }

    async fn confirm(&mut self) {
        if self.session.user_confirmed {
            return;
        }
        self.session.user_confirmed = true;
        if self.session.machine.state() == ProvingState::ReadyToProve {
            self.dispatch(ProvingEvent::StartProving).await;
        } else {
            self.publish();
        }
    }

    async fn handle(&mut self, outcome: Outcome) {
        let event = match outcome {
            Outcome::Fetched(Ok(data)) => {
                self.session.fetched = Some(Arc::new(data));
                ProvingEvent::FetchSuccess
            }
            Outcome::Fetched(Err(e)) => {
                tracing::error!(session = %self.session.session_id, error = %e, "data fetch failed");
                ProvingEvent::FetchError {
                    reason: e.to_string(),
                }
            }
            Outcome::Validated(Ok(validation)) => {
                if validation.matched_csca_pem.is_some() {
                    self.session.matched_csca_pem = validation.matched_csca_pem;
                }
                if validation.switch_to_register {
                    tracing::info!(
                        session = %self.session.session_id,
                        "DSC already registered, proving register circuit instead"
                    );
                    self.session.circuit_type = CircuitType::Register;
                }
                validation.event
            }
            Outcome::Validated(Err(e)) => {
                tracing::error!(session = %self.session.session_id, error = %e, "document validation failed");
                ProvingEvent::ValidationError {
                    reason: e.to_string(),
                }
            }
            Outcome::Connected(Ok(mut channel)) => {
                if self.session.machine.state() != ProvingState::InitTeeConnexion {
                    channel.close().await;
                    return;
                }
                self.session.channel_state = Some(channel.state());
                self.session.channel = Some(channel);
                ProvingEvent::ConnectSuccess
            }
            Outcome::Connected(Err(e)) => {
                tracing::error!(session = %self.session.session_id, error = %e, "TEE connection failed");
                ProvingEvent::ConnectError {
                    reason: e.to_string(),
                }
            }
            Outcome::Submitted(Ok(submission)) => {
                tracing::info!(
                    session = %self.session.session_id,
                    request_id = %submission.request_id,
                    "proof request accepted by TEE"
                );
                self.session.channel_state = Some(ChannelState::Closed);
                self.session.request_id = Some(submission.request_id.clone());
                self.spawn_status(submission);
                self.publish();
                return;
            }
            Outcome::Submitted(Err(e)) => {
                tracing::error!(session = %self.session.session_id, error = %e, "proof submission failed");
                self.session.channel_state = Some(ChannelState::Closed);
                ProvingEvent::ProveError {
                    reason: e.to_string(),
                }
            }
            Outcome::Status(Ok(event)) => event,
            Outcome::Status(Err(e)) => {
                tracing::error!(session = %self.session.session_id, error = %e, "proof status lost");
                ProvingEvent::ProveError {
                    reason: e.to_string(),
                }
            }
        };
        self.dispatch(event).await;
    }

    // ─── Entry Actions ──────────────────────────────────────────────────

    fn spawn_fetch(&mut self) {
        let provider = self.deps.provider.clone();
        let env = self.session.environment;
        let category = self.session.document.document_category;
        let tx = self.outcomes_tx.clone();
        self.tasks.spawn(async move {
            let result = fetch_all(provider.as_ref(), env, category).await;
            let _ = tx.send(Outcome::Fetched(result));
        });
    }

    fn spawn_validation(&mut self) -> Option<ProvingEvent> {
        let Some(fetched) = self.session.fetched.clone() else {
            return Some(ProvingEvent::ValidationError {
                reason: "no fetched data".into(),
            });
        };
        let ctx = ValidationContext {
            circuit_type: self.session.circuit_type,
            environment: self.session.environment,
            document: self.session.document.clone(),
            has_disclosure: self.session.disclosure.is_some(),
            fetched,
            provider: self.deps.provider.clone(),
            secrets: self.deps.secrets.clone(),
        };
        let tx = self.outcomes_tx.clone();
        self.tasks.spawn(async move {
            let _ = tx.send(Outcome::Validated(validate(ctx).await));
        });
        None
    }

    fn spawn_connect(&mut self) -> Option<ProvingEvent> {
        let connect_error = |reason: String| Some(ProvingEvent::ConnectError { reason });
        let Some(fetched) = self.session.fetched.as_ref() else {
            return connect_error("no fetched data".into());
        };
        let kind = self.session.kind();
        let name = match circuit_name(self.session.circuit_type, &self.session.document) {
            Ok(name) => name,
            Err(e) => return connect_error(e.to_string()),
        };
        let Some(url) = fetched.dns_mapping.url_for(kind, &name) else {
            return connect_error(format!("no TEE mapped for {} circuit {name}", kind.as_str()));
        };
        let url = url.to_string();
        tracing::debug!(session = %self.session.session_id, circuit = %name, url = %url, "connecting to TEE");

        let connector = self.deps.tee_connector.clone();
        let verifier = self.deps.attestation.clone();
        let session_id = self.session.session_id;
        let tx = self.outcomes_tx.clone();
        self.tasks.spawn(async move {
            let result =
                SecureChannel::open(connector.as_ref(), &url, session_id, verifier.as_ref()).await;
            let _ = tx.send(Outcome::Connected(result));
        });
        None
    }

    fn spawn_prove(&mut self) -> Option<ProvingEvent> {
        let prove_error = |reason: &str| {
            Some(ProvingEvent::ProveError {
                reason: reason.to_string(),
            })
        };
        let Some(fetched) = self.session.fetched.clone() else {
            return prove_error("no fetched data");
        };
        let name = match circuit_name(self.session.circuit_type, &self.session.document) {
            Ok(name) => name,
            Err(e) => return prove_error(&e.to_string()),
        };
        let Some(channel) = self.session.channel.take() else {
            return prove_error("TEE channel is not open");
        };
        let ctx = ProveContext {
            kind: self.session.kind(),
            circuit_name: name,
            environment: self.session.environment,
            document: self.session.document.clone(),
            fetched,
            disclosure: self.session.disclosure.clone(),
            secrets: self.deps.secrets.clone(),
            inputs: self.deps.inputs.clone(),
        };
        let tx = self.outcomes_tx.clone();
        self.tasks.spawn(async move {
            let _ = tx.send(Outcome::Submitted(prove(ctx, channel).await));
        });
        None
    }

    fn spawn_status(&mut self, submission: Submission) {
        let url = self.config.status_url(submission.endpoint_type).clone();
        let connector = self.deps.status_connector.clone();
        let tx = self.outcomes_tx.clone();
        self.tasks.spawn(async move {
            let listener = StatusListener::new(connector.as_ref(), &url);
            let result = listener.listen(&submission.request_id).await;
            let _ = tx.send(Outcome::Status(result));
        });
    }

    fn finish_stage(&mut self) -> ProvingEvent {
        if self.session.circuit_type != CircuitType::Dsc {
            return ProvingEvent::Completed;
        }
        let previous = self.session.session_id;
        self.session.start_register_stage();
        tracing::info!(
            previous = %previous,
            session = %self.session.session_id,
            "DSC proof verified, continuing with register proof"
        );
        ProvingEvent::SwitchToRegister
    }

    async fn finalize(&mut self, state: ProvingState) {
        if let Some(mut channel) = self.session.channel.take() {
            channel.close().await;
            self.session.channel_state = Some(channel.state());
        }
        if self.recorded {
            return;
        }
        self.recorded = true;

        let error = self.session.machine.last_error().cloned();
        match state {
            ProvingState::Completed => {
                tracing::info!(session = %self.session.session_id, "proving completed")
            }
            ProvingState::Error | ProvingState::Failure => tracing::error!(
                session = %self.session.session_id,
                state = %state,
                reason = ?error.as_ref().and_then(|e| e.reason.as_deref()),
                "proving ended with an error"
            ),
            _ => tracing::warn!(session = %self.session.session_id, state = %state, "proving stopped"),
        }

        let record = ProofRecord {
            session_id: self.session.session_id,
            circuit_type: self.session.circuit_type,
            document_category: self.session.document.document_category,
            environment: self.session.environment,
            state,
            error,
            request_id: self.session.request_id.clone(),
            recorded_at: chrono::Utc::now(),
        };
        if let Err(e) = self.deps.recorder.record(record).await {
            tracing::warn!(session = %self.session.session_id, error = %e, "failed to record proof outcome");
        }
    }

    async fn teardown(&mut self) {
        self.tasks.abort_all();
        while self.tasks.join_next().await.is_some() {}
        if let Some(mut channel) = self.session.channel.take() {
            channel.close().await;
        }
        tracing::debug!(session = %self.session.session_id, "proving session torn down");
    }
}

// ─── Step Bodies ────────────────────────────────────────────────────────────

struct ValidationContext {
    circuit_type: CircuitType,
    environment: Environment,
    document: Arc<DocumentData>,
    has_disclosure: bool,
    fetched: Arc<FetchedData>,
    provider: Arc<dyn RemoteDataProvider>,
    secrets: Arc<dyn SecretProvider>,
}

async fn validate(ctx: ValidationContext) -> Result<Validation, StepError> {
    let doc = ctx.document.as_ref();
    let fetched = ctx.fetched.as_ref();

    let report = check_supported(doc, &fetched.deployed_circuits);
    if !report.is_supported() {
        return Ok(Validation::event(ProvingEvent::PassportNotSupported {
            reason: format!("{}: {}", report.status, report.details),
        }));
    }

    let secret = ctx.secrets.get_or_create_secret().await?.to_field()?;

    if ctx.circuit_type == CircuitType::Disclose {
        if !ctx.has_disclosure {
            return Err(PayloadError::MissingDisclosureRequest.into());
        }
        let event = if is_registered(doc, &secret, &fetched.commitment_tree)? {
            ProvingEvent::ValidationSuccess
        } else {
            ProvingEvent::PassportDataNotFound
        };
        return Ok(Validation::event(event));
    }

    // A document whose CSCA is not cached locally can still match a candidate.
    let registered_locally = match doc.country_signer_certificate_pem {
        Some(_) => is_registered(doc, &secret, &fetched.commitment_tree)?,
        None => {
            tracing::debug!("no local CSCA, trying alternative candidates");
            false
        }
    };
    if registered_locally {
        return Ok(Validation::event(ProvingEvent::AlreadyRegistered));
    }
    let alternative = is_registered_with_alternative_csca(
        doc,
        &secret,
        &fetched.commitment_tree,
        &fetched.alternative_cscas,
    )?;
    if alternative.registered {
        return Ok(Validation {
            event: ProvingEvent::AlreadyRegistered,
            matched_csca_pem: alternative.matched_cert,
            switch_to_register: false,
        });
    }

    let nullifier = compute_nullifier(doc)?;
    if ctx
        .provider
        .is_nullifier_onchain(ctx.environment, &nullifier)
        .await?
    {
        return Ok(Validation::event(ProvingEvent::AccountRecoveryChoice));
    }

    let switch_to_register =
        ctx.circuit_type == CircuitType::Dsc && is_dsc_in_tree(doc, &fetched.dsc_tree)?;
    Ok(Validation {
        event: ProvingEvent::ValidationSuccess,
        matched_csca_pem: None,
        switch_to_register,
    })
}

struct ProveContext {
    kind: ProofKind,
    circuit_name: String,
    environment: Environment,
    document: Arc<DocumentData>,
    fetched: Arc<FetchedData>,
    disclosure: Option<DisclosureRequest>,
    secrets: Arc<dyn SecretProvider>,
    inputs: Arc<dyn CircuitInputGenerator>,
}

/// Submit the proof request, then close the channel whatever the result.
async fn prove(ctx: ProveContext, mut channel: SecureChannel) -> Result<Submission, StepError> {
    let result = submit_proof(&ctx, &mut channel).await;
    channel.close().await;
    result
}

async fn submit_proof(
    ctx: &ProveContext,
    channel: &mut SecureChannel,
) -> Result<Submission, StepError> {
    let secret = ctx.secrets.get_or_create_secret().await?;
    let inputs = ctx
        .inputs
        .generate(InputRequest {
            kind: ctx.kind,
            circuit_name: &ctx.circuit_name,
            document: &ctx.document,
            secret: &secret,
            fetched: &ctx.fetched,
            disclosure: ctx.disclosure.as_ref(),
        })
        .await?;
    let circuit = CircuitPayload {
        name: ctx.circuit_name.clone(),
        inputs: serde_json::to_string(&inputs)?,
    };
    let payload = ProofPayload::build(ctx.kind, circuit, ctx.environment, ctx.disclosure.as_ref())?;
    let request_id = channel.submit(&payload).await?;
    Ok(Submission {
        request_id,
        endpoint_type: payload.endpoint_type(),
    })
}
