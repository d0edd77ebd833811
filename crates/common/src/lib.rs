//! Common types shared across `content-seal` crates: the encrypted envelope
//! wire format, stored records, and record-store errors.

pub mod envelope;
pub mod error;
pub mod record;

pub use envelope::{Content, Envelope};
pub use error::StoreError;
pub use record::Record;
