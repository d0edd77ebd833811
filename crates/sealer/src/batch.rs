//! Batch re-encryption of stored records.
//!
//! A run fetches every record in one scope and walks them in store order:
//!
//! 1. classify the content (envelope or plaintext);
//! 2. skip records already in the target state, which makes reruns idempotent
//!    (with a disabled service every record is skipped);
//! 3. encrypt or decrypt the rest;
//! 4. save the changed record, unless this is a dry run.
//!
//! Failures are isolated per record: a codec or save error is counted and
//! logged and the run moves on. Only the initial fetch can abort a run.
//! There is no rollback; records saved before a crash stay saved.

use std::fmt;

use async_trait::async_trait;
use common::{Content, Record, StoreError};
use tracing::{debug, info, warn};

use crate::classify::{is_envelope, looks_like_envelope};
use crate::service::EncryptionService;

/// Storage backend holding the records a batch run operates on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch all records in `scope`, in a stable order.
    async fn fetch_records(&self, scope: &str) -> Result<Vec<Record>, StoreError>;

    /// Persist `record`, replacing the stored record with the same id and scope.
    async fn save_record(&self, record: &Record) -> Result<(), StoreError>;
}

/// Direction of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Encrypt plaintext records.
    #[default]
    Encrypt,
    /// Decrypt encrypted records.
    Decrypt,
}

impl Mode {
    fn noun(self) -> &'static str {
        match self {
            Mode::Encrypt => "Encryption",
            Mode::Decrypt => "Decryption",
        }
    }

    fn past_tense(self) -> &'static str {
        match self {
            Mode::Encrypt => "Encrypted",
            Mode::Decrypt => "Decrypted",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Encrypt => f.write_str("encrypt"),
            Mode::Decrypt => f.write_str("decrypt"),
        }
    }
}

/// Parameters of a single run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub scope: String,
    pub mode: Mode,
    /// Transform in memory and count, but never call
    /// [`RecordStore::save_record`].
    pub dry_run: bool,
}

/// A record that could not be transformed or saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    pub record_id: String,
    pub message: String,
}

/// Outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub mode: Mode,
    pub dry_run: bool,
    /// Records returned by the fetch.
    pub total: usize,
    /// Records that ended in the target state, whether changed or skipped.
    pub processed: usize,
    /// Records actually encrypted or decrypted.
    pub transformed: usize,
    pub failures: Vec<RecordFailure>,
    /// Ids of records left as plaintext in a decrypt run although they
    /// resemble a damaged envelope.
    pub suspect: Vec<String>,
}

impl Report {
    fn new(options: &BatchOptions, total: usize) -> Self {
        Self {
            mode: options.mode,
            dry_run: options.dry_run,
            total,
            processed: 0,
            transformed: 0,
            failures: Vec::new(),
            suspect: Vec::new(),
        }
    }

    pub fn errors(&self) -> usize {
        self.failures.len()
    }

    fn fail(&mut self, record: &Record, message: String) {
        self.failures.push(RecordFailure {
            record_id: record.id.clone(),
            message,
        });
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} complete:", self.mode.noun())?;
        writeln!(f, "  Total records: {}", self.total)?;
        writeln!(f, "  Processed: {}", self.processed)?;
        writeln!(f, "  {}: {}", self.mode.past_tense(), self.transformed)?;
        writeln!(f, "  Errors: {}", self.errors())?;
        if !self.suspect.is_empty() {
            writeln!(f, "  Suspect (left unchanged): {}", self.suspect.len())?;
        }
        if self.dry_run {
            writeln!(f)?;
            writeln!(f, "This was a dry run. No changes were made.")?;
        }
        Ok(())
    }
}

/// Run one batch pass over `options.scope`.
///
/// # Errors
///
/// Returns the store error if the records cannot be fetched. Per-record
/// failures are reported in [`Report::failures`] instead.
pub async fn run<S>(
    service: &EncryptionService,
    store: &S,
    options: &BatchOptions,
) -> Result<Report, StoreError>
where
    S: RecordStore + ?Sized,
{
    if !service.is_enabled() {
        warn!("encryption service is disabled; no record will be changed");
    }

    info!(scope = %options.scope, mode = %options.mode, dry_run = options.dry_run, "fetching records");
    let records = store.fetch_records(&options.scope).await?;
    let mut report = Report::new(options, records.len());
    info!(scope = %options.scope, total = report.total, "processing records");

    for mut record in records {
        let sealed = is_envelope(&record.content);
        let needs_transform = service.is_enabled()
            && match options.mode {
                Mode::Encrypt => !sealed,
                Mode::Decrypt => sealed,
            };
        if !needs_transform {
            if options.mode == Mode::Decrypt && !sealed && looks_like_envelope(&record.content) {
                warn!(record_id = %record.id, scope = %record.scope, "record resembles a malformed envelope; left unchanged");
                report.suspect.push(record.id.clone());
            } else {
                debug!(record_id = %record.id, "nothing to do; skipping");
            }
            report.processed += 1;
            continue;
        }

        let content = std::mem::take(&mut record.content);
        let transformed = match options.mode {
            Mode::Encrypt => service.encrypt_content(content).map(Content::into_value),
            Mode::Decrypt => service.decrypt_value(content),
        };
        record.content = match transformed {
            Ok(value) => value,
            Err(e) => {
                warn!(record_id = %record.id, scope = %record.scope, error = %e, "failed to {} record", options.mode);
                report.fail(&record, e.to_string());
                continue;
            }
        };

        if !options.dry_run {
            if let Err(e) = store.save_record(&record).await {
                warn!(record_id = %record.id, scope = %record.scope, error = %e, "failed to save record");
                report.fail(&record, e.to_string());
                continue;
            }
        }

        report.processed += 1;
        report.transformed += 1;
    }

    info!(
        scope = %options.scope,
        total = report.total,
        processed = report.processed,
        transformed = report.transformed,
        errors = report.errors(),
        "batch run finished"
    );
    Ok(report)
}
