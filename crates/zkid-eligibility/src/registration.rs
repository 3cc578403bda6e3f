//! # Registration Lookup
//!
//! A holder is registered when the commitment computed from their secret and
//! document appears as a leaf of the identity tree. The commitment binds the
//! CSCA, so a document whose local CSCA is not the one it was registered
//! under will not be found directly. The alternative-CSCA check retries with
//! every candidate published for the document's category.
//!
//! ## Security Invariant
//!
//! Candidate certificates come from a remote service and may be malformed.
//! A candidate that fails to parse is skipped with a warning. Errors about
//! the document itself (its DSC, its metadata, its hash algorithms) are
//! returned, since no candidate can succeed when they occur.

use zkid_core::{AlternativeCscas, DocumentData, HashAlgorithm};
use zkid_crypto::{
    compute_commitment, compute_commitment_with_dsc, dsc_tree_leaf, parse_certificate,
    FieldElement, LeanImt,
};

use crate::error::EligibilityError;

/// Outcome of [`is_registered_with_alternative_csca`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlternativeCscaMatch {
    pub registered: bool,
    /// Key id of the candidate that matched.
    pub key_id: Option<String>,
    /// PEM of the candidate that matched, to be stored with the document.
    pub matched_cert: Option<String>,
}

/// Whether the commitment under the document's own CSCA is in `tree`.
pub fn is_registered(
    doc: &DocumentData,
    secret: &FieldElement,
    tree: &LeanImt,
) -> Result<bool, EligibilityError> {
    let csca = parse_certificate(doc.country_signer_pem()?)?;
    let commitment = compute_commitment(secret, doc.attestation_id(), doc, &csca)?;
    Ok(tree.index_of(&commitment).is_some())
}

/// Whether the commitment under any candidate CSCA is in `tree`.
///
/// Candidates are tried in key-id order; the first match wins.
pub fn is_registered_with_alternative_csca(
    doc: &DocumentData,
    secret: &FieldElement,
    tree: &LeanImt,
    candidates: &AlternativeCscas,
) -> Result<AlternativeCscaMatch, EligibilityError> {
    if candidates.is_empty() {
        return Ok(AlternativeCscaMatch::default());
    }

    // Document-level failures surface before any candidate is tried.
    let dsc = parse_certificate(&doc.document_signer_certificate_pem)?;
    doc.metadata()?
        .e_content_hash_function
        .parse::<HashAlgorithm>()?;

    for (key_id, pem) in candidates {
        let csca = match parse_certificate(pem) {
            Ok(csca) => csca,
            Err(e) => {
                tracing::warn!(key_id = %key_id, error = %e, "skipping unparsable alternative CSCA");
                continue;
            }
        };
        let commitment =
            compute_commitment_with_dsc(secret, doc.attestation_id(), doc, &dsc, &csca)?;
        if tree.contains(&commitment) {
            tracing::info!(key_id = %key_id, "commitment found under alternative CSCA");
            return Ok(AlternativeCscaMatch {
                registered: true,
                key_id: Some(key_id.clone()),
                matched_cert: Some(pem.clone()),
            });
        }
    }
    Ok(AlternativeCscaMatch::default())
}

/// Whether the document's DSC (bound to its CSCA) is already in `dsc_tree`.
pub fn is_dsc_in_tree(doc: &DocumentData, dsc_tree: &LeanImt) -> Result<bool, EligibilityError> {
    let dsc = parse_certificate(&doc.document_signer_certificate_pem)?;
    let csca = parse_certificate(doc.country_signer_pem()?)?;
    let leaf = dsc_tree_leaf(&dsc, &csca)?;
    Ok(dsc_tree.contains(&leaf))
}
