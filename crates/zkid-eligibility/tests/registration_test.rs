//! Registration lookup against trees built from real certificate fixtures.

use zkid_core::{
    AlternativeCscas, CryptoError, DocumentCategory, DocumentData, DocumentError,
    DocumentMetadata, SignatureAlgorithm, ZkidError,
};
use zkid_crypto::{compute_commitment, dsc_tree_leaf, parse_certificate, FieldElement, LeanImt};
use zkid_eligibility::{
    is_dsc_in_tree, is_registered, is_registered_with_alternative_csca, EligibilityError,
};

const CSCA_RSA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../fixtures/certs/csca_rsa.pem"
));
const CSCA_EC: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../fixtures/certs/csca_ec.pem"
));
const DSC_EC: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../fixtures/certs/dsc_ec.pem"
));

fn document(local_csca: Option<&str>) -> DocumentData {
    DocumentData {
        mrz: b"P<UTOERIKSSON<<ANNA<MARIA<<<<<<<<<<<<<<<<<<<L898902C36UTO7408122F1204159ZE184226B<<<<<10"
            .to_vec(),
        signed_content: b"lds-security-object".to_vec(),
        signed_attributes: b"signed-attributes".to_vec(),
        signature: vec![],
        document_signer_certificate_pem: DSC_EC.to_string(),
        country_signer_certificate_pem: local_csca.map(str::to_string),
        document_category: DocumentCategory::Passport,
        is_mock: true,
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

fn secret() -> FieldElement {
    FieldElement::from(424242u64)
}

/// Identity tree holding a decoy plus the commitment under `registered_csca`.
fn identity_tree(registered_csca: &str) -> LeanImt {
    let doc = document(Some(registered_csca));
    let csca = parse_certificate(registered_csca).unwrap();
    let commitment = compute_commitment(&secret(), doc.attestation_id(), &doc, &csca).unwrap();
    let mut tree = LeanImt::new();
    tree.insert(FieldElement::from(9u64)).unwrap();
    tree.insert(commitment).unwrap();
    LeanImt::import(&tree.export().unwrap()).unwrap()
}

#[test]
fn registered_under_local_csca() {
    let tree = identity_tree(CSCA_RSA);
    assert!(is_registered(&document(Some(CSCA_RSA)), &secret(), &tree).unwrap());
    assert!(!is_registered(&document(Some(CSCA_EC)), &secret(), &tree).unwrap());
    assert!(!is_registered(&document(Some(CSCA_RSA)), &FieldElement::from(1u64), &tree).unwrap());
}

#[test]
fn missing_local_csca_is_a_document_error() {
    let tree = identity_tree(CSCA_RSA);
    assert!(matches!(
        is_registered(&document(None), &secret(), &tree),
        Err(EligibilityError::Core(ZkidError::Document(DocumentError::CscaMissing)))
    ));
}

#[test]
fn alternative_csca_fallback_finds_registration() {
    let tree = identity_tree(CSCA_RSA);
    let doc = document(Some(CSCA_EC));
    assert!(!is_registered(&doc, &secret(), &tree).unwrap());

    let mut candidates = AlternativeCscas::new();
    candidates.insert("aa".into(), CSCA_EC.to_string());
    candidates.insert("bb".into(), CSCA_RSA.to_string());
    let found = is_registered_with_alternative_csca(&doc, &secret(), &tree, &candidates).unwrap();
    assert!(found.registered);
    assert_eq!(found.key_id.as_deref(), Some("bb"));
    assert_eq!(found.matched_cert.as_deref(), Some(CSCA_RSA));
}

#[test]
fn malformed_candidates_are_skipped() {
    let tree = identity_tree(CSCA_RSA);
    let doc = document(Some(CSCA_EC));

    let mut candidates = AlternativeCscas::new();
    candidates.insert(
        "00-garbage".into(),
        "-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n".into(),
    );
    candidates.insert("01-empty".into(), String::new());
    candidates.insert("02-valid".into(), CSCA_RSA.to_string());
    let found = is_registered_with_alternative_csca(&doc, &secret(), &tree, &candidates).unwrap();
    assert!(found.registered);
    assert_eq!(found.key_id.as_deref(), Some("02-valid"));

    let mut only_bad = AlternativeCscas::new();
    only_bad.insert("x".into(), "nonsense".into());
    let found = is_registered_with_alternative_csca(&doc, &secret(), &tree, &only_bad).unwrap();
    assert!(!found.registered);
    assert!(found.matched_cert.is_none());
}

#[test]
fn empty_candidate_set_is_not_registered() {
    let tree = identity_tree(CSCA_RSA);
    let found = is_registered_with_alternative_csca(
        &document(Some(CSCA_EC)),
        &secret(),
        &tree,
        &AlternativeCscas::new(),
    )
    .unwrap();
    assert!(!found.registered);
}

#[test]
fn document_errors_propagate_through_fallback() {
    let tree = identity_tree(CSCA_RSA);
    let mut candidates = AlternativeCscas::new();
    candidates.insert("bb".into(), CSCA_RSA.to_string());

    let mut doc = document(Some(CSCA_EC));
    doc.document_signer_certificate_pem = "broken".into();
    assert!(matches!(
        is_registered_with_alternative_csca(&doc, &secret(), &tree, &candidates),
        Err(EligibilityError::Core(ZkidError::Crypto(CryptoError::CertificateParse(_))))
    ));

    let mut doc = document(Some(CSCA_EC));
    if let Some(meta) = doc.metadata.as_mut() {
        meta.e_content_hash_function = "whirlpool".into();
    }
    assert!(matches!(
        is_registered_with_alternative_csca(&doc, &secret(), &tree, &candidates),
        Err(EligibilityError::Core(ZkidError::Crypto(CryptoError::UnsupportedHashAlgorithm(_))))
    ));
}

#[test]
fn dsc_tree_membership() {
    let dsc = parse_certificate(DSC_EC).unwrap();
    let csca = parse_certificate(CSCA_RSA).unwrap();
    let mut tree = LeanImt::new();
    tree.insert(dsc_tree_leaf(&dsc, &csca).unwrap()).unwrap();

    assert!(is_dsc_in_tree(&document(Some(CSCA_RSA)), &tree).unwrap());
    assert!(!is_dsc_in_tree(&document(Some(CSCA_EC)), &tree).unwrap());
    assert!(!is_dsc_in_tree(&document(Some(CSCA_RSA)), &LeanImt::new()).unwrap());
}
