//! # Document Data Model
//!
//! `DocumentData` is everything the scanning shell extracted from a travel
//! document chip (or generated for a mock document), and `DocumentMetadata` is
//! the set of algorithm facts the metadata parser derived from it.
//!
//! ## Ownership
//!
//! Both types are created once per scan and never mutated afterwards. The
//! orchestrator holds the document in an `Arc<DocumentData>` for the lifetime
//! of a session and every operation in the workspace takes `&DocumentData`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::circuit::AttestationId;
use crate::error::DocumentError;

/// Category of identity document. Passports and ID cards use separate trees,
/// circuit lists and attestation identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    Passport,
    IdCard,
}

impl DocumentCategory {
    /// Wire name (`passport`, `id_card`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passport => "passport",
            Self::IdCard => "id_card",
        }
    }

    /// The attestation type identifier folded into commitments.
    pub fn attestation_id(&self) -> AttestationId {
        match self {
            Self::Passport => AttestationId::PASSPORT,
            Self::IdCard => AttestationId::ID_CARD,
        }
    }
}

impl std::fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signature scheme family used by a DSC or CSCA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    #[serde(rename = "rsa")]
    Rsa,
    #[serde(rename = "rsapss")]
    RsaPss,
    #[serde(rename = "ecdsa")]
    Ecdsa,
}

impl SignatureAlgorithm {
    /// Name as used in circuit identifiers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rsa => "rsa",
            Self::RsaPss => "rsapss",
            Self::Ecdsa => "ecdsa",
        }
    }
}

impl std::fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived, read-only algorithm facts about a document.
///
/// Hash function fields are the names reported by the parser. They are not
/// validated here; an unsupported name surfaces when a digest is computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    /// Digest over DG1 in the LDS security object.
    pub dg1_hash_function: String,
    /// Digest over the eContent (LDS security object) in the signed attributes.
    pub e_content_hash_function: String,
    /// Digest over the signed attributes, input to the DSC signature.
    pub signed_attr_hash_function: String,
    /// Signature scheme of the document signature.
    pub signature_algorithm: SignatureAlgorithm,
    /// Curve name (`secp256r1`, `brainpoolP384r1`) or RSA public exponent.
    pub curve_or_exponent: String,
    /// PSS salt length, when `signature_algorithm` is `rsapss`.
    #[serde(default)]
    pub salt_length: Option<u32>,
    /// Key size in bits of the DSC.
    pub signature_algorithm_bits: u32,
    /// ISO 3166 alpha-3 issuing country.
    #[serde(default)]
    pub country_code: String,
    /// Whether a CSCA matching the DSC's authority key id was found locally.
    pub csca_found: bool,
    #[serde(default)]
    pub csca_hash_function: Option<String>,
    #[serde(default)]
    pub csca_signature_algorithm: Option<SignatureAlgorithm>,
    #[serde(default)]
    pub csca_curve_or_exponent: Option<String>,
    #[serde(default)]
    pub csca_salt_length: Option<u32>,
    #[serde(default)]
    pub csca_signature_algorithm_bits: Option<u32>,
}

/// Candidate CSCA certificates (PEM) keyed by subject key identifier, as
/// served for one document category. Iteration order is by key id.
pub type AlternativeCscas = BTreeMap<String, String>;

/// Raw document data as produced by the scanning shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentData {
    /// MRZ text bytes (TD3: 88 chars, TD1: 90 chars).
    pub mrz: Vec<u8>,
    /// eContent: the LDS security object carrying the data group hashes.
    pub signed_content: Vec<u8>,
    /// Signed attributes carrying the eContent digest.
    pub signed_attributes: Vec<u8>,
    /// Document signature over the signed attributes.
    pub signature: Vec<u8>,
    /// Document Signer Certificate, PEM.
    pub document_signer_certificate_pem: String,
    /// Country Signing CA certificate, PEM, when the local trust store had one.
    #[serde(default)]
    pub country_signer_certificate_pem: Option<String>,
    pub document_category: DocumentCategory,
    #[serde(default)]
    pub is_mock: bool,
    #[serde(default)]
    pub metadata: Option<DocumentMetadata>,
}

impl DocumentData {
    /// Parsed metadata, or `DocumentError::MetadataMissing`.
    pub fn metadata(&self) -> Result<&DocumentMetadata, DocumentError> {
        self.metadata.as_ref().ok_or(DocumentError::MetadataMissing)
    }

    /// The document's own CSCA PEM, or `DocumentError::CscaMissing`.
    pub fn country_signer_pem(&self) -> Result<&str, DocumentError> {
        self.country_signer_certificate_pem
            .as_deref()
            .ok_or(DocumentError::CscaMissing)
    }

    /// Attestation identifier for this document's category.
    pub fn attestation_id(&self) -> AttestationId {
        self.document_category.attestation_id()
    }
}
