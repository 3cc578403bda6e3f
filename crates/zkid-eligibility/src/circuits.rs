//! # Circuit Names
//!
//! A circuit is identified by the algorithms it verifies:
//!
//! ```text
//! register[_id]_{dg1}_{econtent}_{signedattr}_{sigalg}_{curveOrExp}[_{salt}]_{bits}
//! dsc_{cscaHash}_{cscaSigAlg}_{cscaCurveOrExp}[_{cscaSalt}]_{cscaBits}
//! vc_and_disclose | vc_and_disclose_id
//! ```
//!
//! ECDSA register circuits omit the bit length since the curve fixes it.

use zkid_core::{CircuitType, DocumentCategory, DocumentData, DocumentMetadata, SignatureAlgorithm};

use crate::error::EligibilityError;

fn id_suffix(category: DocumentCategory) -> &'static str {
    match category {
        DocumentCategory::Passport => "",
        DocumentCategory::IdCard => "_id",
    }
}

/// Register circuit for a document with `metadata`.
pub fn register_circuit_name(metadata: &DocumentMetadata, category: DocumentCategory) -> String {
    let mut name = format!(
        "register{}_{}_{}_{}_{}_{}",
        id_suffix(category),
        metadata.dg1_hash_function,
        metadata.e_content_hash_function,
        metadata.signed_attr_hash_function,
        metadata.signature_algorithm,
        metadata.curve_or_exponent,
    );
    if metadata.signature_algorithm == SignatureAlgorithm::RsaPss {
        if let Some(salt) = metadata.salt_length {
            name.push_str(&format!("_{salt}"));
        }
    }
    if metadata.signature_algorithm != SignatureAlgorithm::Ecdsa {
        name.push_str(&format!("_{}", metadata.signature_algorithm_bits));
    }
    name
}

/// DSC circuit, built from the CSCA facts of `metadata`.
pub fn dsc_circuit_name(metadata: &DocumentMetadata) -> Result<String, EligibilityError> {
    let hash = metadata
        .csca_hash_function
        .as_deref()
        .ok_or(EligibilityError::IncompleteCscaMetadata("csca_hash_function"))?;
    let algorithm = metadata
        .csca_signature_algorithm
        .ok_or(EligibilityError::IncompleteCscaMetadata("csca_signature_algorithm"))?;
    let curve_or_exponent = metadata
        .csca_curve_or_exponent
        .as_deref()
        .ok_or(EligibilityError::IncompleteCscaMetadata("csca_curve_or_exponent"))?;
    let bits = metadata
        .csca_signature_algorithm_bits
        .ok_or(EligibilityError::IncompleteCscaMetadata("csca_signature_algorithm_bits"))?;

    let mut name = format!("dsc_{hash}_{algorithm}_{curve_or_exponent}");
    if algorithm == SignatureAlgorithm::RsaPss {
        if let Some(salt) = metadata.csca_salt_length {
            name.push_str(&format!("_{salt}"));
        }
    }
    name.push_str(&format!("_{bits}"));
    Ok(name)
}

pub fn disclose_circuit_name(category: DocumentCategory) -> &'static str {
    match category {
        DocumentCategory::Passport => "vc_and_disclose",
        DocumentCategory::IdCard => "vc_and_disclose_id",
    }
}

/// Circuit name for `doc` at stage `circuit_type`.
pub fn circuit_name(circuit_type: CircuitType, doc: &DocumentData) -> Result<String, EligibilityError> {
    match circuit_type {
        CircuitType::Disclose => Ok(disclose_circuit_name(doc.document_category).to_string()),
        CircuitType::Register => Ok(register_circuit_name(doc.metadata()?, doc.document_category)),
        CircuitType::Dsc => dsc_circuit_name(doc.metadata()?),
    }
}
