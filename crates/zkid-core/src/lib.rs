//! # zkid-core — Foundational Types for Document Proofs
//!
//! This crate is the leaf of the zkid workspace. It defines the data model
//! shared by every other crate: the scanned document and its parsed metadata,
//! the circuit families and deployment environments, the digest algorithms a
//! document may declare, and the error hierarchy.
//!
//! ## Key Design Principles
//!
//! 1. **Documents are immutable.** `DocumentData` is built once by the scanning
//!    shell and handed to the core behind an `Arc`. Nothing in the workspace
//!    takes `&mut DocumentData`.
//!
//! 2. **Closed enums, not strings.** `CircuitType`, `DocumentCategory`,
//!    `Environment` and `EndpointType` are exhaustive enums. The JSON wire
//!    names live in `serde` attributes and `as_str()` only.
//!
//! 3. **Hash names stay strings until use.** Document metadata reports the
//!    digest algorithms as the parser saw them. `HashAlgorithm::from_str`
//!    turns an unknown name into `CryptoError::UnsupportedHashAlgorithm` at
//!    the point where the digest is actually needed.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `zkid-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod circuit;
pub mod document;
pub mod error;
pub mod hash;
pub mod identity;

// Re-export primary types for ergonomic imports.
pub use circuit::{
    AttestationId, CircuitDnsMapping, CircuitType, DeployedCircuits, EndpointType, Environment,
    ProofKind,
};
pub use document::{
    AlternativeCscas, DocumentCategory, DocumentData, DocumentMetadata, SignatureAlgorithm,
};
pub use error::{CryptoError, DocumentError, StateError, ZkidError};
pub use hash::HashAlgorithm;
pub use identity::{KeyIdentifier, SessionId};
