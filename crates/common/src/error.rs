//! Errors raised by record stores.

use thiserror::Error;

/// Error returned by a record store backend.
///
/// A failure while fetching a scope aborts a batch run; a failure while saving
/// a single record is counted against that record and the run continues.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No records exist for the requested scope.
    #[error("scope not found: {0}")]
    ScopeNotFound(String),

    /// The scope identifier is empty or not usable by the backend.
    #[error("invalid scope name: {0:?}")]
    InvalidScope(String),

    /// A record being saved does not exist in its scope.
    #[error("record {id} not found in scope {scope}")]
    RecordNotFound { scope: String, id: String },

    /// Underlying I/O failure.
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be parsed or written back.
    #[error("malformed store data: {0}")]
    Malformed(String),

    /// Any other backend-specific failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Malformed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_identifiers() {
        let e = StoreError::RecordNotFound {
            scope: "grpAbc".into(),
            id: "17".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("grpAbc"));
        assert!(msg.contains("17"));
    }

    #[test]
    fn json_errors_become_malformed() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        assert!(matches!(StoreError::from(err), StoreError::Malformed(_)));
    }
}
