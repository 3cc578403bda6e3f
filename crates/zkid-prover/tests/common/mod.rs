//! In-memory collaborators: a scripted TEE, a scripted status service, and
//! fixed remote data.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use p256::ecdsa::{SigningKey, VerifyingKey};
use rand_core::OsRng;
use serde_json::{json, Value};
use tokio::sync::watch;

use zkid_client::{EndpointConfig, FetchedData, ProviderError, RemoteDataProvider};
use zkid_core::{
    AlternativeCscas, CircuitDnsMapping, DeployedCircuits, DocumentCategory, DocumentData,
    DocumentMetadata, Environment, SignatureAlgorithm,
};
use zkid_crypto::{
    compute_commitment, parse_certificate, AttestationDocument, EphemeralKeyPair, FieldElement,
    LeanImt, P256AttestationVerifier, SharedKey, SignedAttestation, UserSecret,
};
use zkid_prover::protocol::{HelloParams, RpcResponse, SubmitParams, HELLO_METHOD, SUBMIT_METHOD};
use zkid_prover::{
    CircuitInputGenerator, CollaboratorError, Connector, InputRequest, MessageTransport,
    ProofPayload, ProofRecord, ProofRecorder, ProverConfig, ProverDeps, ProvingOrchestrator,
    ProvingSnapshot, SecretProvider, TransportError,
};

pub const CSCA_RSA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../fixtures/certs/csca_rsa.pem"
));
pub const CSCA_EC: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../fixtures/certs/csca_ec.pem"
));
pub const DSC_EC: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../fixtures/certs/dsc_ec.pem"
));

pub const REGISTER_CIRCUIT: &str = "register_sha256_sha256_sha256_ecdsa_secp256r1";
pub const DSC_CIRCUIT: &str = "dsc_sha256_rsa_65537_2048";
pub const REGISTER_TEE: &str = "wss://tee-register.test";
pub const DSC_TEE: &str = "wss://tee-dsc.test";
pub const DISCLOSE_TEE: &str = "wss://tee-disclose.test";
pub const SECRET: &str = "424242";

// ─── Document and remote data ───────────────────────────────────────────────

pub fn document(local_csca: &str) -> DocumentData {
    DocumentData {
        mrz: b"P<UTOERIKSSON<<ANNA<MARIA<<<<<<<<<<<<<<<<<<<L898902C36UTO7408122F1204159ZE184226B<<<<<10"
            .to_vec(),
        signed_content: b"lds-security-object".to_vec(),
        signed_attributes: b"signed-attributes".to_vec(),
        signature: vec![],
        document_signer_certificate_pem: DSC_EC.to_string(),
        country_signer_certificate_pem: Some(local_csca.to_string()),
        document_category: DocumentCategory::Passport,
        is_mock: false,
        metadata: Some(DocumentMetadata {
            dg1_hash_function: "sha256".into(),
            e_content_hash_function: "sha256".into(),
            signed_attr_hash_function: "sha256".into(),
            signature_algorithm: SignatureAlgorithm::Ecdsa,
            curve_or_exponent: "secp256r1".into(),
            salt_length: None,
            signature_algorithm_bits: 256,
            country_code: "UTO".into(),
            csca_found: true,
            csca_hash_function: Some("sha256".into()),
            csca_signature_algorithm: Some(SignatureAlgorithm::Rsa),
            csca_curve_or_exponent: Some("65537".into()),
            csca_salt_length: None,
            csca_signature_algorithm_bits: Some(2048),
        }),
    }
}

/// The identity commitment of `document(..)` registered under `csca`.
pub fn commitment_under(csca: &str) -> FieldElement {
    let doc = document(csca);
    let secret = UserSecret::new(SECRET).to_field().unwrap();
    let csca = parse_certificate(csca).unwrap();
    compute_commitment(&secret, doc.attestation_id(), &doc, &csca).unwrap()
}

pub fn tree_with(leaves: &[FieldElement]) -> LeanImt {
    let mut tree = LeanImt::new();
    tree.insert(FieldElement::from(7u64)).unwrap();
    for leaf in leaves {
        tree.insert(*leaf).unwrap();
    }
    tree
}

/// Supported document, nothing registered yet, every TEE mapped.
pub fn fetched_data() -> FetchedData {
    let mut dns = CircuitDnsMapping::default();
    dns.register.insert(REGISTER_CIRCUIT.into(), REGISTER_TEE.into());
    dns.dsc.insert(DSC_CIRCUIT.into(), DSC_TEE.into());
    dns.disclose.insert("vc_and_disclose".into(), DISCLOSE_TEE.into());
    FetchedData {
        commitment_tree: tree_with(&[]),
        dsc_tree: LeanImt::new(),
        csca_tree: LeanImt::new(),
        deployed_circuits: DeployedCircuits {
            register: vec![REGISTER_CIRCUIT.into()],
            dsc: vec![DSC_CIRCUIT.into()],
            ..DeployedCircuits::default()
        },
        dns_mapping: dns,
        alternative_cscas: AlternativeCscas::new(),
    }
}

pub struct MemoryProvider {
    pub data: FetchedData,
    pub nullifier_onchain: bool,
    pub fail_fetch: bool,
    pub fetches: AtomicUsize,
    pub environments: Mutex<Vec<Environment>>,
}

impl MemoryProvider {
    fn check(&self, env: Environment) -> Result<(), ProviderError> {
        self.environments.lock().unwrap().push(env);
        if self.fail_fetch {
            return Err(ProviderError::Api {
                endpoint: "memory".into(),
                status: 503,
                body: "tree service down".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteDataProvider for MemoryProvider {
    async fn commitment_tree(
        &self,
        env: Environment,
        _: DocumentCategory,
    ) -> Result<LeanImt, ProviderError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.check(env)?;
        Ok(self.data.commitment_tree.clone())
    }

    async fn dsc_tree(&self, env: Environment, _: DocumentCategory) -> Result<LeanImt, ProviderError> {
        self.check(env)?;
        Ok(self.data.dsc_tree.clone())
    }

    async fn csca_tree(&self, env: Environment, _: DocumentCategory) -> Result<LeanImt, ProviderError> {
        self.check(env)?;
        Ok(self.data.csca_tree.clone())
    }

    async fn deployed_circuits(&self, env: Environment) -> Result<DeployedCircuits, ProviderError> {
        self.check(env)?;
        Ok(self.data.deployed_circuits.clone())
    }

    async fn circuit_dns_mapping(&self, env: Environment) -> Result<CircuitDnsMapping, ProviderError> {
        self.check(env)?;
        Ok(self.data.dns_mapping.clone())
    }

    async fn alternative_cscas(
        &self,
        env: Environment,
        _: DocumentCategory,
    ) -> Result<AlternativeCscas, ProviderError> {
        self.check(env)?;
        Ok(self.data.alternative_cscas.clone())
    }

    async fn is_nullifier_onchain(
        &self,
        _: Environment,
        _: &FieldElement,
    ) -> Result<bool, ProviderError> {
        Ok(self.nullifier_onchain)
    }
}

// ─── Secret, inputs, history ────────────────────────────────────────────────

pub struct StaticSecret;

#[async_trait]
impl SecretProvider for StaticSecret {
    async fn get_or_create_secret(&self) -> Result<UserSecret, CollaboratorError> {
        Ok(UserSecret::new(SECRET))
    }
}

pub struct EchoInputs;

#[async_trait]
impl CircuitInputGenerator for EchoInputs {
    async fn generate(&self, request: InputRequest<'_>) -> Result<Value, CollaboratorError> {
        Ok(json!({
            "circuit": request.circuit_name,
            "kind": request.kind.as_str(),
            "secret": request.secret.to_field().map_err(|e| CollaboratorError::InputGeneration(e.to_string()))?.to_string(),
        }))
    }
}

#[derive(Default)]
pub struct MemoryRecorder {
    pub records: Mutex<Vec<ProofRecord>>,
}

#[async_trait]
impl ProofRecorder for MemoryRecorder {
    async fn record(&self, record: ProofRecord) -> Result<(), CollaboratorError> {
        self.records.lock().unwrap().push(record);
        Ok(())
    }
}

// ─── Scripted TEE ───────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct TeeLog {
    pub urls: Vec<String>,
    pub hello_uuids: Vec<String>,
    pub payloads: Vec<ProofPayload>,
    pub opened: usize,
    pub closed: usize,
}

#[derive(Clone)]
pub struct FakeTee {
    pub authority: SigningKey,
    pub log: Arc<Mutex<TeeLog>>,
    pub reject_hello: bool,
    pub reject_submit: Option<String>,
}

impl FakeTee {
    pub fn new() -> Self {
        Self {
            authority: SigningKey::random(&mut OsRng),
            log: Arc::default(),
            reject_hello: false,
            reject_submit: None,
        }
    }

    pub fn verifier(&self) -> P256AttestationVerifier {
        P256AttestationVerifier::new(vec![VerifyingKey::from(&self.authority)])
    }
}

#[async_trait]
impl Connector for FakeTee {
    async fn connect(&self, url: &str) -> Result<Box<dyn MessageTransport>, TransportError> {
        let mut log = self.log.lock().unwrap();
        log.urls.push(url.to_string());
        log.opened += 1;
        Ok(Box::new(FakeTeeTransport {
            tee: self.clone(),
            pending: VecDeque::new(),
            key: None,
            closed: false,
        }))
    }
}

pub struct FakeTeeTransport {
    tee: FakeTee,
    pending: VecDeque<String>,
    key: Option<SharedKey>,
    closed: bool,
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

impl FakeTeeTransport {
    fn reply(&mut self, response: RpcResponse) {
        self.pending
            .push_back(serde_json::to_string(&response).unwrap());
    }

    fn on_hello(&mut self, params: HelloParams) {
        self.tee.log.lock().unwrap().hello_uuids.push(params.uuid);
        if self.tee.reject_hello {
            self.reply(RpcResponse::failure(1, Some(-32001), "enclave not ready"));
            return;
        }
        let mut server = EphemeralKeyPair::generate();
        let document = AttestationDocument {
            public_key: hex(server.public_key_bytes()),
            measurement: "c0ffee".into(),
            timestamp: 1_700_000_000,
        };
        self.key = Some(server.derive_shared_key(&params.user_pubkey).unwrap());
        let attestation = SignedAttestation::sign(&self.tee.authority, &document)
            .unwrap()
            .to_bytes()
            .unwrap();
        // An unrelated frame first, as a noisy server might send.
        self.reply(RpcResponse::success(99, json!("ignored")));
        self.reply(RpcResponse::success(1, json!({ "attestation": attestation })));
    }

    fn on_submit(&mut self, params: SubmitParams) {
        let envelope = params.envelope().unwrap();
        let plaintext = self.key.as_ref().unwrap().open(&envelope).unwrap();
        let payload: ProofPayload = serde_json::from_slice(&plaintext).unwrap();
        let count = {
            let mut log = self.tee.log.lock().unwrap();
            log.payloads.push(payload);
            log.payloads.len()
        };
        match self.tee.reject_submit.clone() {
            Some(message) => self.reply(RpcResponse::failure(2, None, message)),
            None => self.reply(RpcResponse::success(2, json!(format!("req-{count}")))),
        }
    }
}

#[async_trait]
impl MessageTransport for FakeTeeTransport {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        let message: Value = serde_json::from_str(&text).unwrap();
        let params = message["params"].clone();
        match message["method"].as_str() {
            Some(HELLO_METHOD) => self.on_hello(serde_json::from_value(params).unwrap()),
            Some(SUBMIT_METHOD) => self.on_submit(serde_json::from_value(params).unwrap()),
            other => panic!("unexpected TEE method {other:?}"),
        }
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        Ok(self.pending.pop_front())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if !self.closed {
            self.closed = true;
            self.tee.log.lock().unwrap().closed += 1;
        }
        Ok(())
    }
}

// ─── Scripted status service ────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct StatusLog {
    pub urls: Vec<String>,
    pub subscriptions: Vec<String>,
    pub pongs: usize,
    pub closed: usize,
}

/// Each connection replays the next script of status payloads after the
/// subscription, then hangs up.
#[derive(Clone, Default)]
pub struct FakeStatusService {
    pub scripts: Arc<Mutex<VecDeque<Vec<Value>>>>,
    pub log: Arc<Mutex<StatusLog>>,
}

impl FakeStatusService {
    pub fn new(scripts: Vec<Vec<Value>>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts.into())),
            log: Arc::default(),
        }
    }
}

#[async_trait]
impl Connector for FakeStatusService {
    async fn connect(&self, url: &str) -> Result<Box<dyn MessageTransport>, TransportError> {
        self.log.lock().unwrap().urls.push(url.to_string());
        let script = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
        let mut pending = VecDeque::new();
        pending.push_back(r#"0{"sid":"engine-1","pingInterval":25000,"pingTimeout":20000}"#.to_string());
        Ok(Box::new(FakeStatusTransport {
            log: self.log.clone(),
            script,
            pending,
        }))
    }
}

pub struct FakeStatusTransport {
    log: Arc<Mutex<StatusLog>>,
    script: Vec<Value>,
    pending: VecDeque<String>,
}

#[async_trait]
impl MessageTransport for FakeStatusTransport {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        if text == "40" {
            self.pending.push_back(r#"40{"sid":"socket-1"}"#.into());
        } else if text == "3" {
            self.log.lock().unwrap().pongs += 1;
        } else if let Some(body) = text.strip_prefix("42") {
            let event: Vec<Value> = serde_json::from_str(body).unwrap();
            assert_eq!(event[0], "subscribe");
            let request_id = event[1].as_str().unwrap().to_string();
            self.log.lock().unwrap().subscriptions.push(request_id);
            self.pending.push_back("2".into());
            for status in self.script.drain(..) {
                self.pending
                    .push_back(format!("42{}", json!(["status", status])));
            }
        }
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        Ok(self.pending.pop_front())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.log.lock().unwrap().closed += 1;
        Ok(())
    }
}

// ─── Harness ────────────────────────────────────────────────────────────────

pub struct Scenario {
    pub data: FetchedData,
    pub nullifier_onchain: bool,
    pub fail_fetch: bool,
    pub statuses: Vec<Vec<Value>>,
    pub tee: FakeTee,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            data: fetched_data(),
            nullifier_onchain: false,
            fail_fetch: false,
            statuses: Vec::new(),
            tee: FakeTee::new(),
        }
    }
}

pub struct Harness {
    pub orchestrator: ProvingOrchestrator,
    pub provider: Arc<MemoryProvider>,
    pub tee: Arc<Mutex<TeeLog>>,
    pub status: Arc<Mutex<StatusLog>>,
    pub recorder: Arc<MemoryRecorder>,
}

pub fn config() -> ProverConfig {
    ProverConfig::new(
        Environment::Prod,
        EndpointConfig::local_mock("ws://prod.test").unwrap(),
        EndpointConfig::local_mock("ws://staging.test").unwrap(),
    )
}

/// Route session logs to the test output; `RUST_LOG=debug` shows the
/// transition trace.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_test_writer()
        .try_init();
}

impl Scenario {
    pub fn build(self) -> Harness {
        init_tracing();
        let provider = Arc::new(MemoryProvider {
            data: self.data,
            nullifier_onchain: self.nullifier_onchain,
            fail_fetch: self.fail_fetch,
            fetches: AtomicUsize::new(0),
            environments: Mutex::new(Vec::new()),
        });
        let status = FakeStatusService::new(self.statuses);
        let recorder = Arc::new(MemoryRecorder::default());
        let tee_log = self.tee.log.clone();
        let status_log = status.log.clone();
        let deps = ProverDeps {
            provider: provider.clone(),
            secrets: Arc::new(StaticSecret),
            inputs: Arc::new(EchoInputs),
            recorder: recorder.clone(),
            attestation: Arc::new(self.tee.verifier()),
            tee_connector: Arc::new(self.tee),
            status_connector: Arc::new(status),
        };
        Harness {
            orchestrator: ProvingOrchestrator::new(config(), deps),
            provider,
            tee: tee_log,
            status: status_log,
            recorder,
        }
    }
}

impl Harness {
    /// Wait until a snapshot satisfies `pred`.
    pub async fn wait_for(&self, pred: impl Fn(&ProvingSnapshot) -> bool) -> ProvingSnapshot {
        let mut rx: watch::Receiver<Option<ProvingSnapshot>> = self.orchestrator.subscribe();
        let result = tokio::time::timeout(
            Duration::from_secs(30),
            rx.wait_for(|snapshot| snapshot.as_ref().is_some_and(&pred)),
        )
        .await
        .expect("timed out waiting for snapshot")
        .expect("orchestrator dropped");
        result.clone().unwrap()
    }

    pub async fn wait_terminal(&self) -> ProvingSnapshot {
        self.wait_for(|s| s.is_terminal()).await
    }
}

pub fn status(code: u8) -> Value {
    json!({ "status": code })
}
