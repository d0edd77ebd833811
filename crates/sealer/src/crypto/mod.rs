//! AES-256-GCM primitives used by the envelope codec.
//!
//! This module knows nothing about JSON or envelopes; it seals and opens raw
//! bytes with a key bound at construction time.

pub mod cipher;

pub use cipher::{Cipher, CipherError, SealedBox, KEY_LEN, NONCE_LEN};
