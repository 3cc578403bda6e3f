//! # zkid-crypto — Cryptographic Primitives
//!
//! Provides the cryptographic building blocks for document proofs:
//!
//! - **Poseidon** over the BN254 scalar field (circom parameters), the hash
//!   every circuit uses for commitments, nullifiers and tree nodes.
//! - **Commitments and nullifiers** derived from a document and a user secret.
//! - **X.509 parsing** of document signer and country signer certificates.
//! - **LeanIMT** reconstruction and membership lookup for imported trees.
//! - **Channel cryptography**: P-256 ECDH, AES-256-GCM envelopes, and
//!   attestation verification for the remote proving service.
//!
//! ## Crate Policy
//!
//! - Depends only on `zkid-core` internally.
//! - All functions are pure or take their randomness from the OS RNG. No
//!   function mutates a `DocumentData`.
//! - No mocking of cryptographic operations in tests: fixtures are real
//!   certificates and real keys.
//! - Key material zeroizes on drop and never appears in `Debug` output.

pub mod attestation;
pub mod certificate;
pub mod commitment;
pub mod ecdh;
pub mod envelope;
pub mod field;
pub mod lean_imt;
pub mod poseidon;

pub use attestation::{
    AttestationDocument, AttestationVerifier, P256AttestationVerifier, SignedAttestation,
    VerifiedAttestation,
};
pub use certificate::{parse_certificate, ParsedCertificate, PublicKeyDetails};
pub use commitment::{
    certificate_leaf, compute_commitment, compute_commitment_with_dsc, compute_nullifier,
    dsc_tree_leaf, format_mrz, pack_bytes, pack_bytes_and_poseidon, packed_field_hash,
    MAX_MRZ_LEN,
};
pub use ecdh::EphemeralKeyPair;
pub use envelope::{EncryptedEnvelope, SharedKey};
pub use field::{FieldElement, UserSecret};
pub use lean_imt::{LeanImt, MerkleProof, TreeError};
pub use poseidon::{poseidon2, poseidon_hash};
