//! [`EncryptionService`]: encrypts message content into envelopes and back.
//!
//! Content travels through the codec as JSON. Encrypting serialises the value
//! with `serde_json`, seals the bytes and wraps the result in an [`Envelope`];
//! decrypting reverses this and yields a value that is JSON-equal to the
//! original (numeric representation may normalise, structure does not change).
//!
//! A disabled service holds no key and returns every input unchanged.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{Content, Envelope};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::classify::{classify, looks_like_envelope};
use crate::crypto::{Cipher, NONCE_LEN};
use crate::error::{CodecError, ConstructionError};

/// Envelope codec bound to a single key.
///
/// Immutable after construction and `Send + Sync`; share it by reference.
#[derive(Debug, Clone)]
pub struct EncryptionService {
    cipher: Option<Cipher>,
}

impl EncryptionService {
    /// Build a service.
    ///
    /// When `enabled` is `false` the key is ignored and no cipher is created.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError::EmptyKey`] or
    /// [`ConstructionError::InvalidKeyLength`] if encryption is enabled and the
    /// key is not exactly 32 bytes.
    pub fn new(enabled: bool, key: &[u8]) -> Result<Self, ConstructionError> {
        if !enabled {
            return Ok(Self::disabled());
        }
        if key.is_empty() {
            return Err(ConstructionError::EmptyKey);
        }
        if key.len() != crate::crypto::KEY_LEN {
            return Err(ConstructionError::InvalidKeyLength(key.len()));
        }
        let cipher = Cipher::new(key)?;
        Ok(Self {
            cipher: Some(cipher),
        })
    }

    /// A service that passes all content through untouched.
    pub fn disabled() -> Self {
        Self { cipher: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.cipher.is_some()
    }

    /// Encrypt a JSON value into an envelope.
    ///
    /// Returns [`Content::Plain`] with the input unchanged when disabled.
    ///
    /// # Errors
    ///
    /// [`CodecError::Serialization`] if the value cannot be written as JSON,
    /// [`CodecError::Encryption`] if sealing fails.
    pub fn encrypt_content(&self, content: Value) -> Result<Content, CodecError> {
        let Some(cipher) = &self.cipher else {
            return Ok(Content::Plain(content));
        };

        let plaintext = serde_json::to_vec(&content).map_err(CodecError::Serialization)?;
        let sealed = cipher.seal(&plaintext).map_err(CodecError::Encryption)?;

        Ok(Content::Sealed(Envelope {
            data: STANDARD.encode(&sealed.ciphertext),
            nonce: STANDARD.encode(sealed.nonce),
            encrypted: true,
        }))
    }

    /// Encrypt any serialisable value.
    ///
    /// # Errors
    ///
    /// [`CodecError::Serialization`] if `content` has no JSON representation
    /// (a map with non-string keys, for instance).
    pub fn encrypt_serializable<T>(&self, content: &T) -> Result<Content, CodecError>
    where
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(content).map_err(CodecError::Serialization)?;
        self.encrypt_content(value)
    }

    /// Classify a stored value and decrypt it if it is an envelope.
    ///
    /// Plaintext, including strings that fail to parse as an envelope, is
    /// returned unchanged.
    pub fn decrypt_value(&self, value: Value) -> Result<Value, CodecError> {
        if !self.is_enabled() {
            return Ok(value);
        }
        match classify(value) {
            Content::Plain(value) => {
                if looks_like_envelope(&value) {
                    warn!("content resembles an encrypted envelope but is malformed; passing through unchanged");
                }
                Ok(value)
            }
            sealed => self.decrypt_content(sealed),
        }
    }

    /// Decrypt content back to its original JSON value.
    ///
    /// If the decrypted bytes are not valid JSON the raw bytes are returned as
    /// a (lossily decoded) string instead of failing, so payloads that were
    /// never structured still come back.
    ///
    /// # Errors
    ///
    /// [`CodecError::Encoding`] if `data` or `nonce` is not valid base64 or the
    /// nonce has the wrong size; [`CodecError::Decryption`] if authentication
    /// fails. No plaintext is returned on failure.
    pub fn decrypt_content(&self, content: Content) -> Result<Value, CodecError> {
        let Some(cipher) = &self.cipher else {
            return Ok(content.into_value());
        };
        let envelope = match content {
            Content::Plain(value) => return Ok(value),
            Content::Sealed(envelope) if !envelope.encrypted => return Ok(envelope.to_value()),
            Content::Sealed(envelope) => envelope,
        };

        let ciphertext = decode_field("data", &envelope.data)?;
        let nonce = decode_nonce(&envelope.nonce)?;

        let plaintext = cipher
            .open(&nonce, &ciphertext)
            .map_err(|_| CodecError::Decryption)?;

        match serde_json::from_slice(&plaintext) {
            Ok(value) => Ok(value),
            Err(e) => {
                debug!(error = %e, "decrypted content is not JSON; returning it as text");
                Ok(Value::String(String::from_utf8_lossy(&plaintext).into_owned()))
            }
        }
    }
}

fn decode_field(field: &'static str, encoded: &str) -> Result<Vec<u8>, CodecError> {
    STANDARD.decode(encoded).map_err(|e| CodecError::Encoding {
        field,
        reason: e.to_string(),
    })
}

fn decode_nonce(encoded: &str) -> Result<[u8; NONCE_LEN], CodecError> {
    let bytes = decode_field("nonce", encoded)?;
    bytes.try_into().map_err(|bytes: Vec<u8>| CodecError::Encoding {
        field: "nonce",
        reason: format!("expected {NONCE_LEN} bytes, got {}", bytes.len()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::is_envelope;
    use crate::crypto::KEY_LEN;
    use serde_json::json;
    use std::collections::{BTreeMap, HashSet};

    fn test_key() -> Vec<u8> {
        (0..KEY_LEN as u8).collect()
    }

    fn service() -> EncryptionService {
        EncryptionService::new(true, &test_key()).unwrap()
    }

    fn sealed(content: Content) -> Envelope {
        match content {
            Content::Sealed(e) => e,
            Content::Plain(v) => panic!("expected an envelope, got plain {v}"),
        }
    }

    #[test]
    fn construction_checks_key() {
        assert!(EncryptionService::new(true, &test_key()).unwrap().is_enabled());
        assert!(matches!(
            EncryptionService::new(true, &[0u8; 31]),
            Err(ConstructionError::InvalidKeyLength(31))
        ));
        assert!(matches!(
            EncryptionService::new(true, &[0u8; 33]),
            Err(ConstructionError::InvalidKeyLength(33))
        ));
        assert!(matches!(
            EncryptionService::new(true, b"short"),
            Err(ConstructionError::InvalidKeyLength(5))
        ));
        assert!(matches!(
            EncryptionService::new(true, &[]),
            Err(ConstructionError::EmptyKey)
        ));
    }

    #[test]
    fn disabled_service_ignores_key() {
        let svc = EncryptionService::new(false, &[]).unwrap();
        assert!(!svc.is_enabled());
    }

    #[test]
    fn round_trip_preserves_content() {
        let svc = service();
        let cases = [
            json!("Hello, World!"),
            json!({"key": "value", "number": 42, "nested": {"list": [1, 2.5, null]}}),
            json!(["one", "two", "three"]),
            Value::Null,
        ];
        for content in cases {
            let encrypted = svc.encrypt_content(content.clone()).unwrap();
            assert!(encrypted.is_sealed());
            assert_ne!(encrypted.clone().into_value(), content);
            let decrypted = svc.decrypt_content(encrypted).unwrap();
            assert_eq!(decrypted, content);
        }
    }

    #[test]
    fn round_trip_through_string_form() {
        let svc = service();
        let envelope = sealed(svc.encrypt_content(json!({"text": "hi"})).unwrap());
        let stored = Value::String(serde_json::to_string(&envelope).unwrap());
        assert_eq!(svc.decrypt_value(stored).unwrap(), json!({"text": "hi"}));
    }

    #[test]
    fn encrypt_serializable_accepts_typed_values() {
        let svc = service();
        let mut map = BTreeMap::new();
        map.insert("a", vec![1, 2]);
        let content = svc.encrypt_serializable(&map).unwrap();
        assert_eq!(svc.decrypt_content(content).unwrap(), json!({"a": [1, 2]}));
    }

    #[test]
    fn non_string_map_keys_fail_serialization() {
        let mut map = BTreeMap::new();
        map.insert((1, 2), "x");
        assert!(matches!(
            service().encrypt_serializable(&map),
            Err(CodecError::Serialization(_))
        ));
    }

    #[test]
    fn envelope_structure() {
        let envelope = sealed(service().encrypt_content(json!("Test message")).unwrap());
        assert!(envelope.encrypted);
        assert!(!envelope.data.is_empty());
        assert_eq!(STANDARD.decode(&envelope.nonce).unwrap().len(), NONCE_LEN);
        assert!(STANDARD.decode(&envelope.data).is_ok());
    }

    #[test]
    fn encrypted_output_is_recognised() {
        let svc = service();
        for content in [json!("x"), json!({"a": 1}), Value::Null] {
            let value = svc.encrypt_content(content).unwrap().into_value();
            assert!(is_envelope(&value));
            assert!(is_envelope(&Value::String(value.to_string())));
        }
    }

    #[test]
    fn decrypting_plaintext_is_identity() {
        let svc = service();
        let content = json!("Unencrypted message");
        assert_eq!(svc.decrypt_value(content.clone()).unwrap(), content);
        assert_eq!(
            svc.decrypt_content(Content::Plain(content.clone())).unwrap(),
            content
        );
    }

    #[test]
    fn malformed_envelope_string_passes_through() {
        let content = json!(r#"{"data":"abc","encrypted":tru"#);
        assert_eq!(service().decrypt_value(content.clone()).unwrap(), content);
    }

    #[test]
    fn disabled_service_is_identity() {
        let svc = EncryptionService::disabled();
        let content = json!("Test message");
        assert_eq!(
            svc.encrypt_content(content.clone()).unwrap(),
            Content::Plain(content.clone())
        );
        assert_eq!(svc.decrypt_value(content.clone()).unwrap(), content);

        let envelope = sealed(service().encrypt_content(json!(1)).unwrap()).to_value();
        assert_eq!(svc.decrypt_value(envelope.clone()).unwrap(), envelope);
    }

    #[test]
    fn repeated_encryption_uses_fresh_nonces() {
        let svc = service();
        let mut nonces = HashSet::new();
        let mut payloads = HashSet::new();
        for _ in 0..1000 {
            let envelope = sealed(svc.encrypt_content(json!("same content")).unwrap());
            assert!(nonces.insert(envelope.nonce));
            assert!(payloads.insert(envelope.data));
        }
    }

    #[test]
    fn tampered_data_fails_decryption() {
        let svc = service();
        let mut envelope = sealed(svc.encrypt_content(json!({"secret": true})).unwrap());
        let mut bytes = STANDARD.decode(&envelope.data).unwrap();
        bytes[0] ^= 0x01;
        envelope.data = STANDARD.encode(bytes);
        assert!(matches!(
            svc.decrypt_content(Content::Sealed(envelope)),
            Err(CodecError::Decryption)
        ));
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let envelope = service().encrypt_content(json!("hi")).unwrap();
        let other = EncryptionService::new(true, &[0xAAu8; KEY_LEN]).unwrap();
        assert!(matches!(
            other.decrypt_content(envelope),
            Err(CodecError::Decryption)
        ));
    }

    #[test]
    fn invalid_base64_is_an_encoding_error() {
        let envelope = Envelope {
            data: "!!!".into(),
            nonce: STANDARD.encode([0u8; NONCE_LEN]),
            encrypted: true,
        };
        assert!(matches!(
            service().decrypt_content(envelope.into()),
            Err(CodecError::Encoding { field: "data", .. })
        ));
    }

    #[test]
    fn short_nonce_is_an_encoding_error() {
        let mut envelope = sealed(service().encrypt_content(json!("hi")).unwrap());
        envelope.nonce = STANDARD.encode([0u8; 3]);
        assert!(matches!(
            service().decrypt_content(envelope.into()),
            Err(CodecError::Encoding { field: "nonce", .. })
        ));
    }

    #[test]
    fn envelope_without_payload_fields_is_rejected() {
        let stored = json!(r#"{"encrypted":true}"#);
        assert!(service().decrypt_value(stored).is_err());
    }

    #[test]
    fn plaintext_object_with_encrypted_flag_is_identity() {
        let value = json!({"encrypted": true, "body": "top secret"});
        assert_eq!(service().decrypt_value(value.clone()).unwrap(), value);
    }

    // Produced by an independent AES-256-GCM implementation: key 0x09 * 32,
    // nonce 0x01 * 12, no associated data.
    #[test]
    fn opens_known_aes_gcm_envelopes() {
        let svc = EncryptionService::new(true, &[9u8; KEY_LEN]).unwrap();
        let hello = Envelope {
            data: "mxjkCX+I6vMCQKPXo3dIbRP2fnuFcWI=".into(),
            nonce: "AQEBAQEBAQEBAQEB".into(),
            encrypted: true,
        };
        assert_eq!(svc.decrypt_value(hello.to_value()).unwrap(), json!("hello"));

        let object = Envelope {
            data: "wlL1AGuT6kozJjbvmNh9rIBHRWeVO67xYH5aV3c=".into(),
            nonce: "AQEBAQEBAQEBAQEB".into(),
            encrypted: true,
        };
        let stored = Value::String(object.to_value().to_string());
        assert_eq!(svc.decrypt_value(stored).unwrap(), json!({"text": "hi"}));
    }

    #[test]
    fn false_discriminator_returns_content_unchanged() {
        let envelope = Envelope {
            data: "x".into(),
            nonce: "y".into(),
            encrypted: false,
        };
        let value = envelope.to_value();
        assert_eq!(service().decrypt_content(envelope.into()).unwrap(), value);
    }

    #[test]
    fn non_json_plaintext_falls_back_to_text() {
        let cipher = Cipher::new(&test_key()).unwrap();
        let sealed = cipher.seal(b"raw bytes, not json").unwrap();
        let envelope = Envelope {
            data: STANDARD.encode(&sealed.ciphertext),
            nonce: STANDARD.encode(sealed.nonce),
            encrypted: true,
        };
        assert_eq!(
            service().decrypt_content(envelope.into()).unwrap(),
            json!("raw bytes, not json")
        );
    }
}
