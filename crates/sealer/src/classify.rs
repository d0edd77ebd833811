//! Tells encrypted envelopes apart from plaintext content.
//!
//! | content                                                     | envelope? |
//! |-------------------------------------------------------------|-----------|
//! | `null`                                                      | no        |
//! | object with string `data`, `nonce` and `"encrypted": true`  | yes       |
//! | object with `"encrypted": true` but no string payload       | no        |
//! | string holding an object with `"encrypted": true`           | yes       |
//! | string with `"encrypted": false`, or not JSON               | no        |
//! | anything else                                               | no        |

use common::{Content, Envelope};
use serde_json::Value;

/// Whether `value` is an encrypted envelope, in object or string form.
pub fn is_envelope(value: &Value) -> bool {
    resolve(value).is_some()
}

/// Split `value` into plaintext or envelope.
pub fn classify(value: Value) -> Content {
    match resolve(&value) {
        Some(envelope) => Content::Sealed(envelope),
        None => Content::Plain(value),
    }
}

fn resolve(value: &Value) -> Option<Envelope> {
    match value {
        Value::Object(_) => Envelope::from_value(value),
        Value::String(s) => Envelope::parse(s),
        _ => None,
    }
}

/// Heuristic for values that did not resolve to an envelope but seem to have
/// been meant as one: an `encrypted` key that is not `false`, or a truncated
/// JSON object mentioning it.
pub(crate) fn looks_like_envelope(value: &Value) -> bool {
    match value {
        Value::Object(map) => has_live_discriminator(map),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => has_live_discriminator(&map),
            Ok(_) => false,
            Err(_) => s.trim_start().starts_with('{') && s.contains("\"encrypted\""),
        },
        _ => false,
    }
}

fn has_live_discriminator(map: &serde_json::Map<String, Value>) -> bool {
    map.get("encrypted")
        .is_some_and(|flag| flag != &Value::Bool(false))
}
