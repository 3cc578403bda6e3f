//! Eligibility errors.
//!
//! Only failures that concern the document itself are errors. A candidate
//! certificate that cannot be parsed is skipped, not reported.

use thiserror::Error;

use zkid_core::{CryptoError, DocumentError, ZkidError};

#[derive(Error, Debug)]
pub enum EligibilityError {
    #[error(transparent)]
    Core(#[from] ZkidError),

    /// Circuit name cannot be derived because CSCA facts are missing.
    #[error("incomplete CSCA metadata: {0}")]
    IncompleteCscaMetadata(&'static str),
}

impl From<CryptoError> for EligibilityError {
    fn from(err: CryptoError) -> Self {
        Self::Core(ZkidError::Crypto(err))
    }
}

impl From<DocumentError> for EligibilityError {
    fn from(err: DocumentError) -> Self {
        Self::Core(ZkidError::Document(err))
    }
}
