//! # AES-256-GCM Envelopes
//!
//! The proof request is sealed under the ECDH-derived key with AES-256-GCM:
//! a fresh 12-byte nonce per message and a 16-byte tag carried separately
//! from the ciphertext, which is the shape the TEE submit message expects.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use zkid_core::CryptoError;

pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

/// 32-byte symmetric key shared with the TEE. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedKey([u8; 32]);

impl SharedKey {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0))
    }

    /// Encrypt `plaintext` under a fresh random nonce.
    pub fn seal(&self, plaintext: &[u8]) -> Result<EncryptedEnvelope, CryptoError> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let mut sealed = self
            .cipher()
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        let split = sealed.len().checked_sub(TAG_LEN).ok_or_else(|| {
            CryptoError::Encryption("ciphertext shorter than the tag".to_string())
        })?;
        let mut auth_tag = [0u8; TAG_LEN];
        auth_tag.copy_from_slice(&sealed[split..]);
        sealed.truncate(split);

        Ok(EncryptedEnvelope {
            nonce,
            cipher_text: sealed,
            auth_tag,
        })
    }

    /// Decrypt and authenticate an envelope.
    pub fn open(&self, envelope: &EncryptedEnvelope) -> Result<Vec<u8>, CryptoError> {
        let mut combined = Vec::with_capacity(envelope.cipher_text.len() + TAG_LEN);
        combined.extend_from_slice(&envelope.cipher_text);
        combined.extend_from_slice(&envelope.auth_tag);
        self.cipher()
            .decrypt(Nonce::from_slice(&envelope.nonce), combined.as_slice())
            .map_err(|_| CryptoError::DecryptionFailed)
    }
}

impl std::fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedKey(<redacted>)")
    }
}

/// Nonce, ciphertext and tag of one sealed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    pub nonce: [u8; NONCE_LEN],
    pub cipher_text: Vec<u8>,
    pub auth_tag: [u8; TAG_LEN],
}
