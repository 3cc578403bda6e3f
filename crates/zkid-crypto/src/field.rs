//! # BN254 Field Elements
//!
//! `FieldElement` wraps an element of the BN254 scalar field, the field every
//! circuit in the system operates over. On the wire (tree exports, circuit
//! inputs, logs) it is always a decimal string, matching the circom
//! toolchain's representation.
//!
//! `UserSecret` is the holder's long-lived secret as returned by the secret
//! store. It is kept as text until the moment it is folded into a commitment.

use std::fmt;
use std::str::FromStr;

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

use zkid_core::CryptoError;

/// An element of the BN254 scalar field.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldElement(pub(crate) Fr);

impl FieldElement {
    /// The additive identity.
    pub fn zero() -> Self {
        Self(Fr::zero())
    }

    /// Interpret `bytes` as a little-endian integer, reduced modulo the field order.
    pub fn from_le_bytes_mod_order(bytes: &[u8]) -> Self {
        Self(Fr::from_le_bytes_mod_order(bytes))
    }

    /// Interpret `bytes` as a big-endian integer, reduced modulo the field order.
    pub fn from_be_bytes_mod_order(bytes: &[u8]) -> Self {
        Self(Fr::from_be_bytes_mod_order(bytes))
    }

    /// Canonical 32-byte big-endian encoding.
    pub fn to_be_bytes(&self) -> Vec<u8> {
        self.0.into_bigint().to_bytes_be()
    }

    /// Parse a decimal string or a `0x`-prefixed hex string.
    ///
    /// Hex values are reduced modulo the field order; decimal values must be
    /// canonical (strictly below the modulus).
    pub fn parse_flexible(s: &str) -> Result<Self, CryptoError> {
        let trimmed = s.trim();
        match trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            Some(hex_digits) => {
                let padded = if hex_digits.len() % 2 == 1 {
                    format!("0{hex_digits}")
                } else {
                    hex_digits.to_string()
                };
                let bytes = hex::decode(&padded)
                    .map_err(|e| CryptoError::FieldElement(format!("invalid hex: {e}")))?;
                Ok(Self::from_be_bytes_mod_order(&bytes))
            }
            None => trimmed.parse(),
        }
    }

    pub(crate) fn inner(&self) -> Fr {
        self.0
    }
}

impl From<u64> for FieldElement {
    fn from(value: u64) -> Self {
        Self(Fr::from(value))
    }
}

impl From<Fr> for FieldElement {
    fn from(value: Fr) -> Self {
        Self(value)
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // BigInt formats as a plain decimal integer, including "0".
        write!(f, "{}", self.0.into_bigint())
    }
}

impl fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldElement({self})")
    }
}

impl FromStr for FieldElement {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CryptoError::FieldElement(format!(
                "not a decimal integer: {s:?}"
            )));
        }
        let value = Fr::from_str(s)
            .map_err(|_| CryptoError::FieldElement(format!("not a field element: {s}")))?;
        let element = Self(value);
        // Fr::from_str reduces silently; reject non-canonical encodings.
        let stripped = s.trim_start_matches('0');
        let expected = if stripped.is_empty() { "0" } else { stripped };
        if element.to_string() != expected {
            return Err(CryptoError::FieldElement(format!(
                "value exceeds the field modulus: {s}"
            )));
        }
        Ok(element)
    }
}

impl Serialize for FieldElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ─── User Secret ─────────────────────────────────────────────────────

/// The holder's secret, zeroized on drop and redacted in `Debug`.
#[derive(Clone)]
pub struct UserSecret(Zeroizing<String>);

impl UserSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    /// The secret as a field element (decimal or `0x` hex).
    pub fn to_field(&self) -> Result<FieldElement, CryptoError> {
        FieldElement::parse_flexible(&self.0)
    }
}

impl fmt::Debug for UserSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UserSecret(<redacted>)")
    }
}
