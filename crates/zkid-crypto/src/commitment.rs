//! # Commitments and Nullifiers
//!
//! Derives the two field elements that anchor a holder in the identity tree:
//!
//! - **Commitment** = `Poseidon5(secret, attestation_id, packed(DG1),
//!   packed(H(eContent)), dsc_tree_leaf(DSC, CSCA))`
//! - **Nullifier** = `packed(H(signed_attributes))`, independent of the secret
//!
//! where `packed(x)` splits `x` into 31-byte little-endian field chunks and
//! Poseidon-hashes them, folding in groups of 12 when the input is wider than
//! a single Poseidon call accepts.
//!
//! ## Security Invariant
//!
//! Every function here is a pure function of its inputs. `DocumentData` is
//! only borrowed; the same document and secret always produce the same
//! commitment, on any device.

use zkid_core::{AttestationId, CryptoError, DocumentData, DocumentError, HashAlgorithm, ZkidError};

use crate::certificate::{parse_certificate, ParsedCertificate};
use crate::field::FieldElement;
use crate::poseidon::{poseidon2, poseidon_hash, MAX_POSEIDON_INPUTS};

/// Bytes per packed field element; 31 bytes always fit below the BN254 modulus.
pub const BYTES_PER_ELEMENT: usize = 31;

/// Split `bytes` into 31-byte little-endian field elements.
///
/// An empty input packs to a single zero element.
pub fn pack_bytes(bytes: &[u8]) -> Vec<FieldElement> {
    if bytes.is_empty() {
        return vec![FieldElement::zero()];
    }
    bytes
        .chunks(BYTES_PER_ELEMENT)
        .map(FieldElement::from_le_bytes_mod_order)
        .collect()
}

fn fold_hash(elements: &[FieldElement]) -> Result<FieldElement, CryptoError> {
    if elements.len() <= MAX_POSEIDON_INPUTS {
        return poseidon_hash(elements);
    }
    let chunk_hashes = elements
        .chunks(MAX_POSEIDON_INPUTS)
        .map(poseidon_hash)
        .collect::<Result<Vec<_>, _>>()?;
    fold_hash(&chunk_hashes)
}

/// Pack `bytes` into field elements and Poseidon-hash them.
pub fn pack_bytes_and_poseidon(bytes: &[u8]) -> Result<FieldElement, CryptoError> {
    fold_hash(&pack_bytes(bytes))
}

/// Digest `bytes` with `algorithm`, then pack-and-Poseidon the digest.
pub fn packed_field_hash(
    bytes: &[u8],
    algorithm: HashAlgorithm,
) -> Result<FieldElement, CryptoError> {
    pack_bytes_and_poseidon(&algorithm.digest(bytes))
}

/// Longest MRZ whose DG1 header still uses short-form lengths.
pub const MAX_MRZ_LEN: usize = 0x7F - 3;

/// Wrap raw MRZ bytes in the DG1 ASN.1 header: `61 len+3 5F1F len || mrz`.
///
/// TD1 (90) and TD3 (88) MRZs fit; anything past [`MAX_MRZ_LEN`] would need
/// long-form DER lengths and is rejected.
pub fn format_mrz(mrz: &[u8]) -> Result<Vec<u8>, DocumentError> {
    if mrz.len() > MAX_MRZ_LEN {
        return Err(DocumentError::MrzTooLong(mrz.len()));
    }
    let len = mrz.len() as u8;
    let mut out = Vec::with_capacity(mrz.len() + 5);
    out.extend_from_slice(&[0x61, len + 3, 0x5F, 0x1F, len]);
    out.extend_from_slice(mrz);
    Ok(out)
}

/// Leaf of a certificate in the DSC/CSCA trees: packed Poseidon of its TBS bytes.
pub fn certificate_leaf(cert: &ParsedCertificate) -> Result<FieldElement, CryptoError> {
    pack_bytes_and_poseidon(&cert.tbs_bytes)
}

/// Leaf binding a DSC to the CSCA that issued it.
pub fn dsc_tree_leaf(
    dsc: &ParsedCertificate,
    csca: &ParsedCertificate,
) -> Result<FieldElement, CryptoError> {
    poseidon2(&certificate_leaf(dsc)?, &certificate_leaf(csca)?)
}

/// Compute the holder's commitment for `doc`, anchored on `csca`.
///
/// Fails with `MetadataMissing` when the document was never parsed, with
/// `UnsupportedHashAlgorithm` when the eContent hash is unknown, and with a
/// certificate error when the DSC cannot be parsed.
pub fn compute_commitment(
    secret: &FieldElement,
    attestation_id: AttestationId,
    doc: &DocumentData,
    csca: &ParsedCertificate,
) -> Result<FieldElement, ZkidError> {
    let dsc = parse_certificate(&doc.document_signer_certificate_pem)?;
    compute_commitment_with_dsc(secret, attestation_id, doc, &dsc, csca)
}

/// [`compute_commitment`] with an already parsed DSC, for callers that try
/// several CSCAs against the same document.
pub fn compute_commitment_with_dsc(
    secret: &FieldElement,
    attestation_id: AttestationId,
    doc: &DocumentData,
    dsc: &ParsedCertificate,
    csca: &ParsedCertificate,
) -> Result<FieldElement, ZkidError> {
    let metadata = doc.metadata()?;
    let e_content_hash: HashAlgorithm = metadata.e_content_hash_function.parse()?;

    let dg1_packed = pack_bytes_and_poseidon(&format_mrz(&doc.mrz)?)?;
    let e_content_packed = packed_field_hash(&doc.signed_content, e_content_hash)?;
    let leaf = dsc_tree_leaf(dsc, csca)?;

    Ok(poseidon_hash(&[
        *secret,
        FieldElement::from(attestation_id.0),
        dg1_packed,
        e_content_packed,
        leaf,
    ])?)
}

/// Compute the document nullifier from its signed attributes.
pub fn compute_nullifier(doc: &DocumentData) -> Result<FieldElement, ZkidError> {
    let metadata = doc.metadata()?;
    let algorithm: HashAlgorithm = metadata.signed_attr_hash_function.parse()?;
    Ok(packed_field_hash(&doc.signed_attributes, algorithm)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_bytes_chunking() {
        assert_eq!(pack_bytes(&[]), vec![FieldElement::zero()]);
        assert_eq!(pack_bytes(&[1; 31]).len(), 1);
        assert_eq!(pack_bytes(&[1; 32]).len(), 2);
        assert_eq!(pack_bytes(&[0x02, 0x01])[0], FieldElement::from(0x0102u64));
        let packed = pack_bytes(&[0xff; 62]);
        assert_eq!(packed[0], packed[1]);
    }

    #[test]
    fn test_small_inputs_hash_directly() {
        let bytes = [9u8; 40];
        let direct = poseidon_hash(&pack_bytes(&bytes)).unwrap();
        assert_eq!(pack_bytes_and_poseidon(&bytes).unwrap(), direct);
    }

    #[test]
    fn test_wide_inputs_fold_in_chunks_of_twelve() {
        // 13 elements: one chunk of 12, one of 1.
        let bytes = vec![3u8; 31 * 13];
        let elements = pack_bytes(&bytes);
        assert_eq!(elements.len(), 13);
        let expected = poseidon_hash(&[
            poseidon_hash(&elements[..12]).unwrap(),
            poseidon_hash(&elements[12..]).unwrap(),
        ])
        .unwrap();
        assert_eq!(pack_bytes_and_poseidon(&bytes).unwrap(), expected);
    }

    #[test]
    fn test_very_wide_inputs_fold_recursively() {
        // 31 * 200 bytes → 200 elements → 17 chunk hashes → 2 → 1.
        assert!(pack_bytes_and_poseidon(&vec![5u8; 31 * 200]).is_ok());
    }

    #[test]
    fn test_format_mrz_td3_header() {
        let mrz = vec![b'<'; 88];
        let dg1 = format_mrz(&mrz).unwrap();
        assert_eq!(&dg1[..5], &[0x61, 0x5B, 0x5F, 0x1F, 0x58]);
        assert_eq!(dg1.len(), 93);
    }

    #[test]
    fn test_format_mrz_rejects_long_form_lengths() {
        assert_eq!(format_mrz(&[b'<'; MAX_MRZ_LEN]).unwrap()[1], 0x7F);
        assert_eq!(
            format_mrz(&[b'<'; 253]).unwrap_err(),
            DocumentError::MrzTooLong(253)
        );
        assert_eq!(
            format_mrz(&[b'<'; MAX_MRZ_LEN + 1]).unwrap_err(),
            DocumentError::MrzTooLong(MAX_MRZ_LEN + 1)
        );
    }

    #[test]
    fn test_packed_field_hash_depends_on_algorithm() {
        let a = packed_field_hash(b"abc", HashAlgorithm::Sha256).unwrap();
        let b = packed_field_hash(b"abc", HashAlgorithm::Sha1).unwrap();
        assert_ne!(a, b);
    }
}
