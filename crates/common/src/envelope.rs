//! The encrypted envelope and the content union built around it.
//!
//! # Wire format
//!
//! ```text
//! { "data": "<base64(ciphertext+tag)>", "nonce": "<base64(nonce)>", "encrypted": true }
//! ```
//!
//! Field names are fixed. An absent or `false` `encrypted` flag means the value
//! is not an envelope.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Encrypted content together with the nonce needed to open it.
///
/// Missing `data` or `nonce` fields deserialise as empty strings, but only
/// [`Envelope::parse`] accepts that; the object form must carry both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Base64 (standard alphabet, padded) of ciphertext + authentication tag.
    #[serde(default)]
    pub data: String,
    /// Base64 of the nonce used to seal `data`.
    #[serde(default)]
    pub nonce: String,
    /// Format discriminator, always `true` for envelopes produced here.
    #[serde(default)]
    pub encrypted: bool,
}

impl Envelope {
    /// Interpret a JSON object as an envelope.
    ///
    /// Returns `None` for non-objects, for objects missing `data` or `nonce`
    /// or holding them as non-strings, and for objects whose discriminator is
    /// absent or `false`. A plaintext object that merely has an
    /// `"encrypted": true` key is therefore not an envelope.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let has_payload = ["data", "nonce"]
            .iter()
            .all(|k| obj.get(*k).is_some_and(Value::is_string));
        if !has_payload {
            return None;
        }
        Self::from_object_lenient(value)
    }

    /// Parse a string holding a serialised envelope.
    ///
    /// Any JSON object with `"encrypted": true` is accepted, with missing
    /// payload fields left empty so that decoding rejects it loudly.
    pub fn parse(s: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(s).ok()?;
        Self::from_object_lenient(&value)
    }

    fn from_object_lenient(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        Envelope::deserialize(value).ok().filter(|e| e.encrypted)
    }

    /// Object form of this envelope.
    pub fn to_value(&self) -> Value {
        json!({
            "data": self.data,
            "nonce": self.nonce,
            "encrypted": self.encrypted,
        })
    }
}

/// Message content as seen at the codec boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// Plaintext JSON value.
    Plain(Value),
    /// Encrypted envelope.
    Sealed(Envelope),
}

impl Content {
    pub fn is_sealed(&self) -> bool {
        matches!(self, Content::Sealed(_))
    }

    /// Convert back to a storable JSON value. Envelopes use their object form.
    pub fn into_value(self) -> Value {
        match self {
            Content::Plain(v) => v,
            Content::Sealed(e) => e.to_value(),
        }
    }
}

impl From<Envelope> for Content {
    fn from(envelope: Envelope) -> Self {
        Content::Sealed(envelope)
    }
}

impl From<Content> for Value {
    fn from(content: Content) -> Self {
        content.into_value()
    }
}
