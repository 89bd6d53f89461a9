//! JSON Lines record store
//!
//! One request per line in a local file. Every append syncs the file before
//! returning and a failed write is cut back out. Reads go back to disk, so
//! the row count always reflects the file's current contents.

use super::{file, RecordStore};
use crate::error::StoreError;
use crate::types::AdmissionRequest;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Record store backed by a `.jsonl` file
#[derive(Debug)]
pub struct JsonlRecordStore {
    path: PathBuf,
    closed: AtomicBool,
}

impl JsonlRecordStore {
    /// Open the store, creating the file and its parent directories
    ///
    /// An unterminated last line left by an interrupted write is dropped.
    ///
    /// # Errors
    /// Returns error if the file cannot be created or opened
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        file::prepare(&path).await?;
        tracing::debug!(path = %path.display(), "record store opened");
        Ok(Self {
            path,
            closed: AtomicBool::new(false),
        })
    }

    /// Path of the backing file
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    async fn read(&self) -> Result<String, StoreError> {
        let mut text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| StoreError::io_error(&self.path, e))?;
        let complete = file::complete_lines(&self.path, &text).len();
        text.truncate(complete);
        Ok(text)
    }
}

#[async_trait]
impl RecordStore for JsonlRecordStore {
    async fn append(&self, request: &AdmissionRequest) -> Result<(), StoreError> {
        self.ensure_open()?;
        let mut line = serde_json::to_string(request)?;
        line.push('\n');
        file::append(&self.path, None, line.as_bytes()).await
    }

    async fn len(&self) -> Result<usize, StoreError> {
        self.ensure_open()?;
        let text = self.read().await?;
        Ok(text.lines().filter(|line| !line.trim().is_empty()).count())
    }

    async fn records(&self) -> Result<Vec<AdmissionRequest>, StoreError> {
        self.ensure_open()?;
        let text = self.read().await?;
        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                serde_json::from_str(line).map_err(|e| StoreError::Corrupt {
                    line: index + 1,
                    message: e.to_string(),
                })
            })
            .collect()
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        tracing::debug!(path = %self.path.display(), "record store closed");
        Ok(())
    }
}
