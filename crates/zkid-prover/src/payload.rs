//! # Proof Request Payloads
//!
//! The plaintext sealed inside the submit message. The `type` tag selects
//! the proof kind; registration kinds always verify on chain, disclosure
//! kinds carry the relying party's endpoint and user data.

use serde::{Deserialize, Serialize};

use zkid_core::{CircuitType, EndpointType, Environment, ProofKind};

/// Circuit selection plus its witness inputs, as a JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitPayload {
    pub name: String,
    pub inputs: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationPayload {
    pub onchain: bool,
    pub endpoint_type: EndpointType,
    pub circuit: CircuitPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisclosurePayload {
    pub onchain: bool,
    pub endpoint_type: EndpointType,
    pub endpoint: String,
    pub circuit: CircuitPayload,
    pub user_defined_data: String,
    pub version: u32,
}

/// The relying party's request for a disclosure proof, supplied at `init`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisclosureRequest {
    pub endpoint: String,
    pub endpoint_type: EndpointType,
    pub scope: String,
    #[serde(default)]
    pub user_defined_data: String,
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProofPayload {
    Register(RegistrationPayload),
    RegisterId(RegistrationPayload),
    Dsc(RegistrationPayload),
    DscId(RegistrationPayload),
    Disclose(DisclosurePayload),
    DiscloseId(DisclosurePayload),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("disclosure proof requested without a disclosure request")]
    MissingDisclosureRequest,
}

impl ProofPayload {
    /// Build the payload for `kind`.
    ///
    /// Registration kinds target the environment's on-chain endpoint.
    /// Disclosure kinds require `disclosure`.
    pub fn build(
        kind: ProofKind,
        circuit: CircuitPayload,
        env: Environment,
        disclosure: Option<&DisclosureRequest>,
    ) -> Result<Self, PayloadError> {
        if kind.circuit_type() == CircuitType::Disclose {
            let request = disclosure.ok_or(PayloadError::MissingDisclosureRequest)?;
            let payload = DisclosurePayload {
                onchain: request.endpoint_type.is_onchain(),
                endpoint_type: request.endpoint_type,
                endpoint: request.endpoint.clone(),
                circuit,
                user_defined_data: request.user_defined_data.clone(),
                version: request.version,
            };
            return Ok(match kind {
                ProofKind::DiscloseId => Self::DiscloseId(payload),
                _ => Self::Disclose(payload),
            });
        }

        let payload = RegistrationPayload {
            onchain: true,
            endpoint_type: env.onchain_endpoint(),
            circuit,
        };
        Ok(match kind {
            ProofKind::RegisterId => Self::RegisterId(payload),
            ProofKind::Dsc => Self::Dsc(payload),
            ProofKind::DscId => Self::DscId(payload),
            _ => Self::Register(payload),
        })
    }

    pub fn kind(&self) -> ProofKind {
        match self {
            Self::Register(_) => ProofKind::Register,
            Self::RegisterId(_) => ProofKind::RegisterId,
            Self::Dsc(_) => ProofKind::Dsc,
            Self::DscId(_) => ProofKind::DscId,
            Self::Disclose(_) => ProofKind::Disclose,
            Self::DiscloseId(_) => ProofKind::DiscloseId,
        }
    }

    pub fn endpoint_type(&self) -> EndpointType {
        match self {
            Self::Register(p) | Self::RegisterId(p) | Self::Dsc(p) | Self::DscId(p) => {
                p.endpoint_type
            }
            Self::Disclose(p) | Self::DiscloseId(p) => p.endpoint_type,
        }
    }

    pub fn circuit(&self) -> &CircuitPayload {
        match self {
            Self::Register(p) | Self::RegisterId(p) | Self::Dsc(p) | Self::DscId(p) => &p.circuit,
            Self::Disclose(p) | Self::DiscloseId(p) => &p.circuit,
        }
    }
}
