//! Errors returned by the envelope codec.

use thiserror::Error;

use crate::crypto::{CipherError, KEY_LEN};

/// Failure to build an [`EncryptionService`](crate::service::EncryptionService).
///
/// Fatal: a service that fails construction cannot be used.
#[derive(Debug, Error)]
pub enum ConstructionError {
    #[error("encryption key cannot be empty when encryption is enabled")]
    EmptyKey,

    #[error("encryption key must be exactly {KEY_LEN} bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("failed to create AES-256-GCM cipher: {0}")]
    Cipher(#[from] CipherError),
}

/// Failure to encrypt or decrypt a single piece of content.
///
/// Never fatal to the process; the caller decides whether to abort or to
/// record the failure and move on.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The content could not be converted to JSON.
    #[error("failed to serialize content to JSON: {0}")]
    Serialization(#[source] serde_json::Error),

    /// Sealing the serialised content failed.
    #[error("failed to encrypt content: {0}")]
    Encryption(#[source] CipherError),

    /// An envelope field is not valid base64 or has the wrong size.
    #[error("failed to decode envelope {field}: {reason}")]
    Encoding { field: &'static str, reason: String },

    /// Authentication failed: wrong key, or nonce/ciphertext were altered.
    #[error("failed to decrypt content: authentication failed")]
    Decryption,
}
