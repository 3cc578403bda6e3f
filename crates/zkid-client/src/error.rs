//! Remote data provider errors.

use zkid_crypto::TreeError;

/// Errors from remote data fetches.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Non-2xx status or a `status` other than `success` in the envelope.
    #[error("{endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response body did not have the expected shape.
    #[error("failed to deserialize response from {endpoint}: {reason}")]
    Deserialization { endpoint: String, reason: String },
    /// A served tree export could not be imported.
    #[error("invalid tree from {endpoint}: {source}")]
    Tree {
        endpoint: String,
        source: TreeError,
    },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}
