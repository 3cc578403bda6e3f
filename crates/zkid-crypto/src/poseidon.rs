//! # Poseidon over BN254
//!
//! Circom-compatible Poseidon, backed by `light-poseidon`. The circom
//! parameter set supports between 1 and 12 inputs; wider inputs are folded by
//! the packing helpers in [`crate::commitment`].
//!
//! ## Security Invariant
//!
//! Every hash a circuit recomputes (commitment, nullifier, tree nodes,
//! certificate leaves) goes through [`poseidon_hash`]. The parameter set is
//! selected by input width only, never configured by callers.

use ark_bn254::Fr;
use light_poseidon::{Poseidon, PoseidonHasher};

use zkid_core::CryptoError;

use crate::field::FieldElement;

/// Largest input width of the circom parameter set.
pub const MAX_POSEIDON_INPUTS: usize = 12;

/// Poseidon hash of 1..=12 field elements.
pub fn poseidon_hash(inputs: &[FieldElement]) -> Result<FieldElement, CryptoError> {
    if inputs.is_empty() || inputs.len() > MAX_POSEIDON_INPUTS {
        return Err(CryptoError::FieldElement(format!(
            "poseidon accepts 1..={MAX_POSEIDON_INPUTS} inputs, got {}",
            inputs.len()
        )));
    }
    let mut hasher = Poseidon::<Fr>::new_circom(inputs.len())
        .map_err(|e| CryptoError::FieldElement(format!("poseidon parameters: {e}")))?;
    let elements: Vec<Fr> = inputs.iter().map(FieldElement::inner).collect();
    hasher
        .hash(&elements)
        .map(FieldElement::from)
        .map_err(|e| CryptoError::FieldElement(format!("poseidon hash: {e}")))
}

/// Two-to-one Poseidon, the LeanIMT node hash.
pub fn poseidon2(left: &FieldElement, right: &FieldElement) -> Result<FieldElement, CryptoError> {
    poseidon_hash(&[*left, *right])
}
