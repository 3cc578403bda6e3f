//! # Digest Algorithms
//!
//! Defines `HashAlgorithm`, the set of digests a travel document may declare
//! for its data groups, its signed content (eContent) and its signed
//! attributes. ICAO 9303 allows SHA-1 and the SHA-2 family; anything else is
//! rejected with `CryptoError::UnsupportedHashAlgorithm`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

use crate::error::CryptoError;

/// A digest algorithm used somewhere in a document's signature chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// Returns the algorithm name as used in circuit names and metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }

    /// Output length in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha224 => 28,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Hash `data` with this algorithm.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha1 => Sha1::digest(data).to_vec(),
            Self::Sha224 => Sha224::digest(data).to_vec(),
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha384 => Sha384::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = CryptoError;

    /// Accepts the lowercase names used by document metadata, with or without
    /// a dash (`sha256`, `SHA-256`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "sha1" => Ok(Self::Sha1),
            "sha224" => Ok(Self::Sha224),
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            _ => Err(CryptoError::UnsupportedHashAlgorithm(s.to_string())),
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_dashed_and_upper_case() {
        assert_eq!("SHA-256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("sha1".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha1);
        assert_eq!(" sha_512 ".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha512);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "md5".parse::<HashAlgorithm>().unwrap_err();
        assert_eq!(err, CryptoError::UnsupportedHashAlgorithm("md5".into()));
    }

    #[test]
    fn test_output_lengths_match_digests() {
        for algo in [
            HashAlgorithm::Sha1,
            HashAlgorithm::Sha224,
            HashAlgorithm::Sha256,
            HashAlgorithm::Sha384,
            HashAlgorithm::Sha512,
        ] {
            assert_eq!(algo.digest(b"abc").len(), algo.output_len(), "{algo}");
        }
    }

    #[test]
    fn test_known_sha256_vector() {
        let digest = HashAlgorithm::Sha256.digest(b"abc");
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        assert_eq!(
            hex,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        let algo = HashAlgorithm::Sha384;
        assert_eq!(algo.to_string().parse::<HashAlgorithm>().unwrap(), algo);
    }
}
