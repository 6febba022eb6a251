//! JSON-lines feedback store.
//!
//! Each entry is one line of JSON (`{"timestamp": ..., "text": ...}`)
//! appended to a single file. Appends are serialized through a mutex and
//! written with one `write_all` call so records never interleave. Reading
//! returns entries newest-first; a missing file reads as empty.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use safe_scan_core::store::{FeedbackEntry, FeedbackStore};
use safe_scan_core::ScanError;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub struct FileFeedbackStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileFeedbackStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the parent directory and an empty file if neither exists.
    pub async fn ensure_exists(&self) -> Result<(), ScanError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(storage_err)?;
            }
        }
        tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(storage_err)?;
        Ok(())
    }
}

fn storage_err(e: std::io::Error) -> ScanError {
    ScanError::StorageError(e.to_string())
}

#[async_trait]
impl FeedbackStore for FileFeedbackStore {
    async fn submit(&self, text: &str) -> Result<FeedbackEntry, ScanError> {
        let entry = FeedbackEntry::new(text)?;
        let mut line =
            serde_json::to_string(&entry).map_err(|e| ScanError::StorageError(e.to_string()))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        self.ensure_exists().await?;
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&self.path)
            .await
            .map_err(storage_err)?;
        file.write_all(line.as_bytes()).await.map_err(storage_err)?;
        file.flush().await.map_err(storage_err)?;
        debug!(path = %self.path.display(), "feedback appended");

        Ok(entry)
    }

    async fn list(&self) -> Result<Vec<FeedbackEntry>, ScanError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(storage_err(e)),
        };

        let mut entries = Vec::new();
        for (lineno, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<FeedbackEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(
                    path = %self.path.display(),
                    line = lineno + 1,
                    error = %e,
                    "skipping unreadable feedback record"
                ),
            }
        }
        entries.reverse();
        Ok(entries)
    }
}
