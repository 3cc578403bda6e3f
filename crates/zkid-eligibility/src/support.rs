//! # Document Support
//!
//! A document is supported when its metadata is present, its CSCA is known,
//! and both the register and DSC circuits it needs are deployed. Checks run
//! in that order and the first failure is reported.

use serde::{Deserialize, Serialize};

use zkid_core::{CircuitType, DeployedCircuits, DocumentData, ProofKind};

use crate::circuits::{dsc_circuit_name, register_circuit_name};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportStatus {
    MetadataMissing,
    CscaNotFound,
    RegistrationCircuitUnsupported,
    DscCircuitUnsupported,
    Supported,
}

impl SupportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MetadataMissing => "metadata_missing",
            Self::CscaNotFound => "csca_not_found",
            Self::RegistrationCircuitUnsupported => "registration_circuit_unsupported",
            Self::DscCircuitUnsupported => "dsc_circuit_unsupported",
            Self::Supported => "supported",
        }
    }
}

impl std::fmt::Display for SupportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`check_supported`]. `details` names the offending circuit or
/// the missing input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportReport {
    pub status: SupportStatus,
    pub details: String,
}

impl SupportReport {
    fn new(status: SupportStatus, details: impl Into<String>) -> Self {
        Self {
            status,
            details: details.into(),
        }
    }

    pub fn is_supported(&self) -> bool {
        self.status == SupportStatus::Supported
    }
}

/// Check `doc` against the deployed circuit lists.
pub fn check_supported(doc: &DocumentData, deployed: &DeployedCircuits) -> SupportReport {
    let Some(metadata) = doc.metadata.as_ref() else {
        return SupportReport::new(SupportStatus::MetadataMissing, "document metadata is missing");
    };
    if !metadata.csca_found {
        return SupportReport::new(
            SupportStatus::CscaNotFound,
            format!("no CSCA found for {}", metadata.country_code),
        );
    }

    let category = doc.document_category;
    let register = register_circuit_name(metadata, category);
    if !deployed.contains(ProofKind::new(CircuitType::Register, category), &register) {
        return SupportReport::new(SupportStatus::RegistrationCircuitUnsupported, register);
    }

    let dsc = match dsc_circuit_name(metadata) {
        Ok(name) => name,
        Err(e) => return SupportReport::new(SupportStatus::DscCircuitUnsupported, e.to_string()),
    };
    if !deployed.contains(ProofKind::new(CircuitType::Dsc, category), &dsc) {
        return SupportReport::new(SupportStatus::DscCircuitUnsupported, dsc);
    }

    SupportReport::new(SupportStatus::Supported, "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use zkid_core::{DocumentCategory, DocumentMetadata, SignatureAlgorithm};

    fn doc(metadata: Option<DocumentMetadata>) -> DocumentData {
        DocumentData {
            mrz: vec![],
            signed_content: vec![],
            signed_attributes: vec![],
            signature: vec![],
            document_signer_certificate_pem: String::new(),
            country_signer_certificate_pem: None,
            document_category: DocumentCategory::Passport,
            is_mock: false,
            metadata,
        }
    }

    fn metadata() -> DocumentMetadata {
        DocumentMetadata {
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
        }
    }

    fn deployed(register: &[&str], dsc: &[&str]) -> DeployedCircuits {
        DeployedCircuits {
            register: register.iter().map(|s| s.to_string()).collect(),
            dsc: dsc.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    const REGISTER: &str = "register_sha256_sha256_sha256_ecdsa_secp256r1";
    const DSC: &str = "dsc_sha256_rsa_65537_2048";

    #[test]
    fn test_supported_document() {
        let report = check_supported(&doc(Some(metadata())), &deployed(&[REGISTER], &[DSC]));
        assert!(report.is_supported());
    }

    #[test]
    fn test_first_failing_check_wins() {
        let none = deployed(&[], &[]);
        assert_eq!(
            check_supported(&doc(None), &none).status,
            SupportStatus::MetadataMissing
        );

        let mut meta = metadata();
        meta.csca_found = false;
        assert_eq!(
            check_supported(&doc(Some(meta)), &none).status,
            SupportStatus::CscaNotFound
        );

        let report = check_supported(&doc(Some(metadata())), &none);
        assert_eq!(report.status, SupportStatus::RegistrationCircuitUnsupported);
        assert_eq!(report.details, REGISTER);

        let report = check_supported(&doc(Some(metadata())), &deployed(&[REGISTER], &[]));
        assert_eq!(report.status, SupportStatus::DscCircuitUnsupported);
        assert_eq!(report.details, DSC);
    }

    #[test]
    fn test_id_cards_use_id_lists() {
        let mut d = doc(Some(metadata()));
        d.document_category = DocumentCategory::IdCard;
        let report = check_supported(&d, &deployed(&[REGISTER], &[DSC]));
        assert_eq!(report.status, SupportStatus::RegistrationCircuitUnsupported);
        assert_eq!(report.details, "register_id_sha256_sha256_sha256_ecdsa_secp256r1");
    }

    #[test]
    fn test_status_wire_name() {
        assert_eq!(
            serde_json::to_string(&SupportStatus::DscCircuitUnsupported).unwrap(),
            "\"dsc_circuit_unsupported\""
        );
    }
}
