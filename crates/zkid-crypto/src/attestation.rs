//! # TEE Attestation Verification
//!
//! Before any key agreement, the proving service proves that its ephemeral
//! public key was produced inside an approved enclave. The attestation is a
//! [`SignedAttestation`]: a JSON [`AttestationDocument`] plus a DER ECDSA
//! P-256/SHA-256 signature from a pinned attestation authority.
//!
//! ## Security Invariant
//!
//! Verification fails closed: no trust anchors, a signature from an unknown
//! key, an unparsable document, a measurement outside the allow-list, or a
//! public key that is not a P-256 point all yield `AttestationInvalid`. The
//! channel never derives a key from an unverified attestation.

use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::PublicKey;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use zkid_core::CryptoError;

/// Claims made by the enclave about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationDocument {
    /// Hex SEC1 uncompressed P-256 public key of the enclave session.
    pub public_key: String,
    /// Hex enclave measurement (code identity).
    pub measurement: String,
    /// Unix seconds at which the document was produced.
    pub timestamp: i64,
}

/// An attestation document and its authority signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedAttestation {
    /// JSON-encoded [`AttestationDocument`].
    pub document: Vec<u8>,
    /// DER ECDSA signature over `document`.
    pub signature: Vec<u8>,
}

impl SignedAttestation {
    /// Sign `document` with an attestation authority key.
    pub fn sign(
        authority: &SigningKey,
        document: &AttestationDocument,
    ) -> Result<Self, CryptoError> {
        let document = serde_json::to_vec(document)
            .map_err(|e| CryptoError::AttestationInvalid(format!("encode document: {e}")))?;
        let signature: Signature = authority.sign(&document);
        Ok(Self {
            document,
            signature: signature.to_der().as_bytes().to_vec(),
        })
    }

    /// Serialized form carried in the `attestation` byte array.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CryptoError> {
        serde_json::to_vec(self)
            .map_err(|e| CryptoError::AttestationInvalid(format!("encode attestation: {e}")))
    }
}

/// Outcome of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedAttestation {
    /// SEC1 uncompressed server public key, validated as a curve point.
    pub public_key: Vec<u8>,
    pub measurement: Vec<u8>,
    pub timestamp: i64,
}

/// Checks an attestation blob and returns the attested server key.
pub trait AttestationVerifier: Send + Sync {
    fn verify(&self, attestation: &[u8]) -> Result<VerifiedAttestation, CryptoError>;
}

/// Verifier for P-256-signed attestation documents.
#[derive(Debug, Clone, Default)]
pub struct P256AttestationVerifier {
    trust_anchors: Vec<VerifyingKey>,
    allowed_measurements: Option<Vec<Vec<u8>>>,
}

impl P256AttestationVerifier {
    /// Verifier that trusts the given authority keys and any measurement.
    pub fn new(trust_anchors: Vec<VerifyingKey>) -> Self {
        Self {
            trust_anchors,
            allowed_measurements: None,
        }
    }

    /// Parse authority keys from SEC1 bytes.
    pub fn from_sec1_keys<'a>(
        keys: impl IntoIterator<Item = &'a [u8]>,
    ) -> Result<Self, CryptoError> {
        let anchors = keys
            .into_iter()
            .map(|k| {
                VerifyingKey::from_sec1_bytes(k)
                    .map_err(|_| CryptoError::KeyError("invalid trust anchor key".into()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(anchors))
    }

    /// Restrict accepted enclaves to these measurements.
    pub fn with_allowed_measurements(mut self, measurements: Vec<Vec<u8>>) -> Self {
        self.allowed_measurements = Some(measurements);
        self
    }
}

fn invalid(reason: impl Into<String>) -> CryptoError {
    CryptoError::AttestationInvalid(reason.into())
}

impl AttestationVerifier for P256AttestationVerifier {
    fn verify(&self, attestation: &[u8]) -> Result<VerifiedAttestation, CryptoError> {
        if self.trust_anchors.is_empty() {
            return Err(invalid("no trust anchors configured"));
        }
        let signed: SignedAttestation = serde_json::from_slice(attestation)
            .map_err(|e| invalid(format!("malformed attestation: {e}")))?;
        let signature = Signature::from_der(&signed.signature)
            .map_err(|_| invalid("malformed signature"))?;
        let trusted = self
            .trust_anchors
            .iter()
            .any(|anchor| anchor.verify(&signed.document, &signature).is_ok());
        if !trusted {
            tracing::warn!(anchors = self.trust_anchors.len(), "attestation signed by an unknown authority");
            return Err(invalid("signature does not match any trust anchor"));
        }

        let document: AttestationDocument = serde_json::from_slice(&signed.document)
            .map_err(|e| invalid(format!("malformed document: {e}")))?;
        let measurement =
            hex::decode(&document.measurement).map_err(|_| invalid("measurement is not hex"))?;
        if let Some(allowed) = &self.allowed_measurements {
            let listed = allowed
                .iter()
                .any(|m| bool::from(m.as_slice().ct_eq(measurement.as_slice())));
            if !listed {
                tracing::warn!(measurement = %document.measurement, "attestation measurement not allowed");
                return Err(invalid(format!(
                    "measurement {} is not allowed",
                    document.measurement
                )));
            }
        }
        let public_key =
            hex::decode(&document.public_key).map_err(|_| invalid("public key is not hex"))?;
        if public_key.len() != 65 || PublicKey::from_sec1_bytes(&public_key).is_err() {
            return Err(invalid("public key is not an uncompressed P-256 point"));
        }

        tracing::debug!(measurement = %document.measurement, "attestation verified");
        Ok(VerifiedAttestation {
            public_key,
            measurement,
            timestamp: document.timestamp,
        })
    }
}
