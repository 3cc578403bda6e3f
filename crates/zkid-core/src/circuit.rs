//! # Circuits, Environments and Endpoints
//!
//! Closed enums for the proof stages (`CircuitType`), the deployment
//! environment (`Environment`), the relying-party endpoint kinds
//! (`EndpointType`), and the six wire-level proof kinds (`ProofKind`) obtained
//! by crossing a circuit type with a document category.
//!
//! Also defines the two lookup tables fetched from the remote API:
//! [`DeployedCircuits`] (which circuit names are live) and
//! [`CircuitDnsMapping`] (which TEE URL serves a circuit).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::document::DocumentCategory;

/// Proof stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CircuitType {
    /// Register the user commitment in the identity tree.
    Register,
    /// Register the document signer certificate in the DSC tree.
    Dsc,
    /// Selectively disclose attributes to a relying party.
    Disclose,
}

impl CircuitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Dsc => "dsc",
            Self::Disclose => "disclose",
        }
    }
}

impl std::fmt::Display for CircuitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deployment environment for trees, APIs and TEEs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Prod,
    Staging,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prod => "prod",
            Self::Staging => "staging",
        }
    }

    /// Endpoint type used for on-chain registration in this environment.
    pub fn onchain_endpoint(&self) -> EndpointType {
        match self {
            Self::Prod => EndpointType::Celo,
            Self::Staging => EndpointType::StagingCelo,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the verified proof is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointType {
    Celo,
    Https,
    StagingCelo,
    StagingHttps,
}

impl EndpointType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Celo => "celo",
            Self::Https => "https",
            Self::StagingCelo => "staging_celo",
            Self::StagingHttps => "staging_https",
        }
    }

    /// Whether status updates for this endpoint come from the staging service.
    pub fn is_staging(&self) -> bool {
        matches!(self, Self::StagingCelo | Self::StagingHttps)
    }

    /// Whether the proof is verified on chain.
    pub fn is_onchain(&self) -> bool {
        matches!(self, Self::Celo | Self::StagingCelo)
    }
}

impl std::fmt::Display for EndpointType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attestation type identifier folded into every commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttestationId(pub u64);

impl AttestationId {
    pub const PASSPORT: AttestationId = AttestationId(1);
    pub const ID_CARD: AttestationId = AttestationId(2);
}

/// A circuit type crossed with a document category.
///
/// This is the `type` discriminator of the TEE payload and the key of the
/// circuit DNS mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofKind {
    Register,
    RegisterId,
    Dsc,
    DscId,
    Disclose,
    DiscloseId,
}

impl ProofKind {
    /// Combine a stage and a category.
    pub fn new(circuit_type: CircuitType, category: DocumentCategory) -> Self {
        match (circuit_type, category) {
            (CircuitType::Register, DocumentCategory::Passport) => Self::Register,
            (CircuitType::Register, DocumentCategory::IdCard) => Self::RegisterId,
            (CircuitType::Dsc, DocumentCategory::Passport) => Self::Dsc,
            (CircuitType::Dsc, DocumentCategory::IdCard) => Self::DscId,
            (CircuitType::Disclose, DocumentCategory::Passport) => Self::Disclose,
            (CircuitType::Disclose, DocumentCategory::IdCard) => Self::DiscloseId,
        }
    }

    pub fn circuit_type(&self) -> CircuitType {
        match self {
            Self::Register | Self::RegisterId => CircuitType::Register,
            Self::Dsc | Self::DscId => CircuitType::Dsc,
            Self::Disclose | Self::DiscloseId => CircuitType::Disclose,
        }
    }

    pub fn category(&self) -> DocumentCategory {
        match self {
            Self::Register | Self::Dsc | Self::Disclose => DocumentCategory::Passport,
            Self::RegisterId | Self::DscId | Self::DiscloseId => DocumentCategory::IdCard,
        }
    }

    /// Payload discriminator (`register_id`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::RegisterId => "register_id",
            Self::Dsc => "dsc",
            Self::DscId => "dsc_id",
            Self::Disclose => "disclose",
            Self::DiscloseId => "disclose_id",
        }
    }

    /// Key in the remote lookup tables (`REGISTER_ID`).
    pub fn table_key(&self) -> &'static str {
        match self {
            Self::Register => "REGISTER",
            Self::RegisterId => "REGISTER_ID",
            Self::Dsc => "DSC",
            Self::DscId => "DSC_ID",
            Self::Disclose => "DISCLOSE",
            Self::DiscloseId => "DISCLOSE_ID",
        }
    }
}

impl std::fmt::Display for ProofKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Circuit names currently deployed, per registration family.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedCircuits {
    #[serde(rename = "REGISTER", default)]
    pub register: Vec<String>,
    #[serde(rename = "REGISTER_ID", default)]
    pub register_id: Vec<String>,
    #[serde(rename = "DSC", default)]
    pub dsc: Vec<String>,
    #[serde(rename = "DSC_ID", default)]
    pub dsc_id: Vec<String>,
}

impl DeployedCircuits {
    /// Deployed names for a proof kind. Disclosure circuits are not listed.
    pub fn names(&self, kind: ProofKind) -> &[String] {
        match kind {
            ProofKind::Register => &self.register,
            ProofKind::RegisterId => &self.register_id,
            ProofKind::Dsc => &self.dsc,
            ProofKind::DscId => &self.dsc_id,
            ProofKind::Disclose | ProofKind::DiscloseId => &[],
        }
    }

    /// Whether `name` is deployed for `kind`.
    pub fn contains(&self, kind: ProofKind, name: &str) -> bool {
        self.names(kind).iter().any(|n| n == name)
    }
}

/// Circuit name → TEE WebSocket URL, per proof kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitDnsMapping {
    #[serde(rename = "REGISTER", default)]
    pub register: BTreeMap<String, String>,
    #[serde(rename = "REGISTER_ID", default)]
    pub register_id: BTreeMap<String, String>,
    #[serde(rename = "DSC", default)]
    pub dsc: BTreeMap<String, String>,
    #[serde(rename = "DSC_ID", default)]
    pub dsc_id: BTreeMap<String, String>,
    #[serde(rename = "DISCLOSE", default)]
    pub disclose: BTreeMap<String, String>,
    #[serde(rename = "DISCLOSE_ID", default)]
    pub disclose_id: BTreeMap<String, String>,
}

impl CircuitDnsMapping {
    fn table(&self, kind: ProofKind) -> &BTreeMap<String, String> {
        match kind {
            ProofKind::Register => &self.register,
            ProofKind::RegisterId => &self.register_id,
            ProofKind::Dsc => &self.dsc,
            ProofKind::DscId => &self.dsc_id,
            ProofKind::Disclose => &self.disclose,
            ProofKind::DiscloseId => &self.disclose_id,
        }
    }

    /// URL of the TEE serving `circuit_name` for `kind`, if mapped.
    pub fn url_for(&self, kind: ProofKind, circuit_name: &str) -> Option<&str> {
        self.table(kind).get(circuit_name).map(String::as_str)
    }
}
