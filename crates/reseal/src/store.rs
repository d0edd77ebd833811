//! [`JsonFileStore`]: a record store backed by one JSON file per scope.
//!
//! Layout:
//!
//! ```text
//! <root>/<scope>.json   [ { "id": "1", "content": ... }, ... ]
//! ```
//!
//! Saving rewrites the whole scope file through a temp file in the same
//! directory followed by a rename, so a crash never leaves a half-written
//! scope behind.
//!
//! Each [`save_record`](RecordStore::save_record) re-reads and rewrites the
//! entire scope file, so a batch over `n` records does O(n²) I/O. That is
//! acceptable for the small scopes this store targets; large scopes need a
//! backend with per-record writes.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use common::{Record, StoreError};
use sealer::RecordStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

/// On-disk form of a record; the scope is implied by the file name.
#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    id: String,
    content: Value,
}

/// Directory of per-scope JSON files.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Open an existing store directory.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` does not exist or is not a directory.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        let meta = tokio::fs::metadata(&root).await?;
        if !meta.is_dir() {
            return Err(StoreError::Backend(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    fn scope_path(&self, scope: &str) -> Result<PathBuf, StoreError> {
        let invalid = scope.trim().is_empty()
            || scope.starts_with('.')
            || scope.contains("..")
            || scope.chars().any(std::path::is_separator);
        if invalid {
            return Err(StoreError::InvalidScope(scope.to_owned()));
        }
        Ok(self.root.join(format!("{scope}.json")))
    }

    async fn read_scope(&self, scope: &str) -> Result<Vec<StoredRecord>, StoreError> {
        let path = self.scope_path(scope)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::ScopeNotFound(scope.to_owned()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn write_scope(&self, scope: &str, records: &[StoredRecord]) -> Result<(), StoreError> {
        let path = self.scope_path(scope)?;
        let bytes = serde_json::to_vec_pretty(records)?;
        write_atomic(&path, &bytes).await?;
        debug!(scope, records = records.len(), "scope file rewritten");
        Ok(())
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn fetch_records(&self, scope: &str) -> Result<Vec<Record>, StoreError> {
        let stored = self.read_scope(scope).await?;
        Ok(stored
            .into_iter()
            .map(|r| Record::new(r.id, scope, r.content))
            .collect())
    }

    async fn save_record(&self, record: &Record) -> Result<(), StoreError> {
        let mut stored = self.read_scope(&record.scope).await?;
        let slot = stored
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or_else(|| StoreError::RecordNotFound {
                scope: record.scope.clone(),
                id: record.id.clone(),
            })?;
        slot.content = record.content.clone();
        self.write_scope(&record.scope, &stored).await
    }
}

/// Write `bytes` to a temp file next to `path`, fsync it, then rename it over
/// `path`. The temp file is removed if any step fails.
async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no parent")
    })?;
    let file_name = path.file_name().and_then(|s| s.to_str()).unwrap_or("scope");
    let tmp_path = parent.join(format!(".{}.tmp.{}", file_name, Uuid::new_v4()));

    let result = async {
        let mut f = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
            .await?;
        f.write_all(bytes).await?;
        f.sync_all().await?;
        drop(f);
        tokio::fs::rename(&tmp_path, path).await
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&tmp_path).await;
    }
    result
}
