//! Records as handed out by a record store.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single stored message.
///
/// `content` is either plaintext JSON or an encrypted envelope, in object form
/// or serialised as a JSON string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Identifier unique within the scope.
    pub id: String,
    /// Scope (topic, collection, ...) the record belongs to.
    pub scope: String,
    /// Message payload.
    pub content: Value,
}

impl Record {
    pub fn new(id: impl Into<String>, scope: impl Into<String>, content: Value) -> Self {
        Self {
            id: id.into(),
            scope: scope.into(),
            content,
        }
    }
}
