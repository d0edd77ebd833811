//! Reversible encryption of stored message content.
//!
//! - [`EncryptionService`] turns arbitrary JSON content into an encrypted
//!   [`Envelope`](common::Envelope) and back.
//! - [`classify`] tells envelopes apart from plaintext so repeated runs are
//!   idempotent.
//! - [`batch`] applies the service across every record in a
//!   [`RecordStore`](batch::RecordStore) scope.

pub mod batch;
pub mod classify;
pub mod crypto;
pub mod error;
pub mod key;
pub mod service;

pub use batch::{BatchOptions, Mode, RecordStore, Report};
pub use classify::{classify, is_envelope};
pub use error::{CodecError, ConstructionError};
pub use key::{KeyError, SecretKey};
pub use service::EncryptionService;
