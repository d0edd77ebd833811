//! [`SecretKey`]: key material for the envelope codec, loaded from base64.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::crypto::KEY_LEN;

/// Errors produced while loading key material.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The key file could not be read.
    #[error("failed to read key file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The key text is not valid standard base64.
    #[error("failed to decode key: {0}")]
    Decode(#[from] base64::DecodeError),

    /// The decoded key has an unexpected length.
    #[error("encryption key must be exactly {KEY_LEN} bytes, got {0}")]
    InvalidLength(usize),
}

/// Fixed-size key buffer that holds exactly [`KEY_LEN`] bytes.
///
/// Only lives long enough to key an
/// [`EncryptionService`](crate::service::EncryptionService). The memory is
/// overwritten with zeroes on drop.
pub struct SecretKey(Box<[u8; KEY_LEN]>);

impl SecretKey {
    /// Wrap raw key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidLength`] if the slice has the wrong length.
    pub fn from_bytes(key_bytes: &[u8]) -> Result<Self, KeyError> {
        if key_bytes.len() != KEY_LEN {
            return Err(KeyError::InvalidLength(key_bytes.len()));
        }
        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(key_bytes);
        Ok(Self(buf))
    }

    /// Decode a base64 key. Surrounding whitespace (a trailing newline from a
    /// key file, say) is ignored.
    pub fn from_base64(encoded: &str) -> Result<Self, KeyError> {
        let decoded = Zeroizing::new(STANDARD.decode(encoded.trim())?);
        Self::from_bytes(&decoded)
    }

    /// Read a base64 key from a file.
    pub fn from_file(path: &Path) -> Result<Self, KeyError> {
        let text = Zeroizing::new(std::fs::read_to_string(path).map_err(|source| {
            KeyError::Read {
                path: path.display().to_string(),
                source,
            }
        })?);
        Self::from_base64(&text)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }
}

impl Zeroize for SecretKey {
    fn zeroize(&mut self) {
        (*self.0).zeroize();
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl ZeroizeOnDrop for SecretKey {}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey([REDACTED])")
    }
}
