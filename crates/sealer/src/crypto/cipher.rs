//! AES-256-GCM sealing and opening of serialised content.
//!
//! Plain GCM (NIST SP 800-38D): envelopes open with any AES-256-GCM
//! implementation holding the same key.
//!
//! **Nonces:** every call to [`Cipher::seal`] draws a fresh 96-bit nonce from
//! the OS CSPRNG. There is deliberately no API that accepts a caller-supplied
//! nonce for encryption; nonces are only ever passed back in to open.
//!
//! No associated data is bound to the ciphertext.

use aes_gcm::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use thiserror::Error;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-GCM nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// Output of a single seal operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBox {
    /// Raw nonce bytes.
    pub nonce: [u8; NONCE_LEN],
    /// Raw ciphertext + authentication tag bytes.
    pub ciphertext: Vec<u8>,
}

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The key is the wrong length (must be [`KEY_LEN`] bytes).
    #[error("invalid key length: expected {KEY_LEN} bytes, got {0}")]
    InvalidKeyLength(usize),

    /// AES-GCM encryption or decryption failed.
    #[error("aead operation failed")]
    AeadFailure,
}

/// An AEAD instance bound to one key for its whole lifetime.
#[derive(Clone)]
pub struct Cipher {
    aead: Aes256Gcm,
}

impl Cipher {
    /// Key a new cipher.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidKeyLength`] if `key` is not [`KEY_LEN`] bytes.
    pub fn new(key: &[u8]) -> Result<Self, CipherError> {
        if key.len() != KEY_LEN {
            return Err(CipherError::InvalidKeyLength(key.len()));
        }
        let aead = Aes256Gcm::new_from_slice(key)
            .map_err(|_| CipherError::InvalidKeyLength(key.len()))?;
        Ok(Self { aead })
    }

    /// Encrypt `plaintext` under a freshly generated nonce.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::AeadFailure`] if the plaintext exceeds the
    /// maximum length the mode supports.
    pub fn seal(&self, plaintext: &[u8]) -> Result<SealedBox, CipherError> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = self
            .aead
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| CipherError::AeadFailure)?;

        Ok(SealedBox { nonce, ciphertext })
    }

    /// Authenticate and decrypt `ciphertext`.
    ///
    /// Nothing is returned unless the tag verifies.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::AeadFailure`] if authentication fails (wrong key,
    /// wrong nonce or tampered data).
    pub fn open(&self, nonce: &[u8; NONCE_LEN], ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
        self.aead
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CipherError::AeadFailure)
    }
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Cipher(AES-256-GCM, [REDACTED])")
    }
}
