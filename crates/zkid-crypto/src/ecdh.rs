//! # Ephemeral P-256 Key Agreement
//!
//! One `EphemeralKeyPair` is generated per proving session. Its public half
//! goes into the TEE hello message in uncompressed SEC1 form (65 bytes); the
//! secret half is consumed by the single ECDH derivation, so a session can
//! never derive two keys from the same secret.

use p256::ecdh::EphemeralSecret;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::PublicKey;
use rand_core::OsRng;

use zkid_core::CryptoError;

use crate::envelope::SharedKey;

/// Length of an uncompressed SEC1 P-256 point.
pub const UNCOMPRESSED_POINT_LEN: usize = 65;

/// Session key pair. The secret is `None` once the shared key was derived.
pub struct EphemeralKeyPair {
    secret: Option<EphemeralSecret>,
    public: Vec<u8>,
}

impl EphemeralKeyPair {
    /// Generate a fresh key pair from the OS RNG.
    pub fn generate() -> Self {
        let secret = EphemeralSecret::random(&mut OsRng);
        let public = secret
            .public_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec();
        Self {
            secret: Some(secret),
            public,
        }
    }

    /// Uncompressed SEC1 encoding of the public key.
    pub fn public_key_bytes(&self) -> &[u8] {
        &self.public
    }

    /// Whether the secret is still available.
    pub fn is_consumed(&self) -> bool {
        self.secret.is_none()
    }

    /// ECDH with `peer_public` (SEC1). The AES key is the raw shared
    /// x-coordinate. Consumes the ephemeral secret.
    pub fn derive_shared_key(&mut self, peer_public: &[u8]) -> Result<SharedKey, CryptoError> {
        let peer = PublicKey::from_sec1_bytes(peer_public)
            .map_err(|_| CryptoError::KeyError("peer public key is not a P-256 point".into()))?;
        let secret = self
            .secret
            .take()
            .ok_or_else(|| CryptoError::KeyError("ephemeral secret already consumed".into()))?;
        let shared = secret.diffie_hellman(&peer);
        let mut key = [0u8; 32];
        key.copy_from_slice(shared.raw_secret_bytes().as_slice());
        Ok(SharedKey::new(key))
    }
}

impl std::fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralKeyPair")
            .field("public", &hex::encode(&self.public))
            .field("consumed", &self.is_consumed())
            .finish()
    }
}
