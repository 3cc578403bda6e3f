//! # Identifier Newtypes
//!
//! Newtype wrappers for the identifiers that cross process boundaries: the
//! proving session UUID sent to the TEE and the status service, and the
//! certificate key identifiers used to index candidate CSCAs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one proving attempt.
///
/// Sent in the TEE hello and submit messages; the TEE echoes a request id
/// that the status service is subscribed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Generate a new random session identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A certificate key identifier (SKI / AKI), lowercase hex without separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyIdentifier(String);

impl KeyIdentifier {
    /// Build from raw identifier bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Normalize a textual identifier: strips `:` separators and whitespace,
    /// lowercases.
    pub fn normalize(raw: &str) -> Self {
        Self(
            raw.chars()
                .filter(|c| c.is_ascii_hexdigit())
                .collect::<String>()
                .to_ascii_lowercase(),
        )
    }

    /// The hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for KeyIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// OpenSSL-style rendering (uppercase, colon separated) normalizes
        /// back to the raw-bytes identifier.
        #[test]
        fn key_identifier_normalize_matches_bytes(bytes in proptest::collection::vec(any::<u8>(), 1..32)) {
            let rendered = bytes
                .iter()
                .map(|b| format!("{b:02X}"))
                .collect::<Vec<_>>()
                .join(":");
            prop_assert_eq!(KeyIdentifier::normalize(&rendered), KeyIdentifier::from_bytes(&bytes));
        }

        /// Normalizing is idempotent.
        #[test]
        fn key_identifier_normalize_idempotent(raw in "[0-9a-fA-F: ]{0,64}") {
            let once = KeyIdentifier::normalize(&raw);
            prop_assert_eq!(KeyIdentifier::normalize(once.as_str()), once);
        }
    }
}
