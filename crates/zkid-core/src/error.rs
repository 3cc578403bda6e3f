//! # Error Types — Structured Error Hierarchy
//!
//! Defines the error types shared across the zkid workspace. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Cryptographic errors fail loudly with full context.
//! - Document errors name the missing input so the caller can map them to the
//!   right orchestrator outcome.
//! - State machine errors include the current state and the rejected target.

use thiserror::Error;

/// Top-level error type for the zkid workspace.
#[derive(Error, Debug)]
pub enum ZkidError {
    /// A cryptographic operation failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// The document lacks data required by the operation.
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// State machine transition rejected.
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error in cryptographic operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The named digest algorithm is not implemented.
    #[error("unsupported hash algorithm: {0}")]
    UnsupportedHashAlgorithm(String),

    /// The certificate could not be decoded (PEM, DER or ASN.1 level).
    #[error("certificate parse error: {0}")]
    CertificateParse(String),

    /// The certificate uses a signature algorithm or curve this crate does not map.
    #[error("unsupported certificate algorithm: {0}")]
    UnsupportedCertificateAlgorithm(String),

    /// Remote attestation failed verification.
    #[error("attestation invalid: {0}")]
    AttestationInvalid(String),

    /// Key generation, decoding or agreement failed.
    #[error("key error: {0}")]
    KeyError(String),

    /// Authenticated encryption failed.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Authenticated decryption failed (wrong key, nonce or tampered data).
    #[error("decryption failed: authentication tag mismatch")]
    DecryptionFailed,

    /// A value could not be interpreted as a field element or hashed.
    #[error("field element error: {0}")]
    FieldElement(String),
}

/// Error raised when a document lacks an input the operation needs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// The document was never run through the metadata parser.
    #[error("document metadata is missing")]
    MetadataMissing,

    /// No country-signer certificate is attached to the document.
    #[error("country signer certificate is missing")]
    CscaMissing,

    /// The MRZ does not fit a single-byte DG1 length header.
    #[error("MRZ of {0} bytes is too long for DG1")]
    MrzTooLong(usize),
}

/// Error in state machine transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Attempted an invalid state transition.
    #[error("invalid transition from {from} to {to}: {reason}")]
    InvalidTransition {
        /// Current state name.
        from: String,
        /// Attempted target state name.
        to: String,
        /// Reason the transition was rejected.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crypto_error_converts_into_top_level() {
        let err: ZkidError = CryptoError::UnsupportedHashAlgorithm("md5".into()).into();
        assert_eq!(err.to_string(), "crypto error: unsupported hash algorithm: md5");
    }

    #[test]
    fn state_error_display_names_both_states() {
        let err = StateError::InvalidTransition {
            from: "IDLE".into(),
            to: "READY".into(),
            reason: "hello not sent".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("IDLE"));
        assert!(msg.contains("READY"));
    }
}
