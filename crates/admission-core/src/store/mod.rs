//! Record store
//!
//! Append-only persistence of admission requests. Rows are never updated
//! or deleted through this interface; the store's current size also feeds
//! protocol ID generation.

mod file;
mod jsonl;
mod table;

pub use table::{encode_csv, CsvRecordStore, COLUMNS};
pub use jsonl::JsonlRecordStore;

use crate::error::StoreError;
use crate::types::AdmissionRequest;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt::Debug;

/// Append-only request storage
#[async_trait]
pub trait RecordStore: Send + Sync + Debug {
    /// Append one request
    ///
    /// Either the whole request is stored or nothing is.
    ///
    /// # Errors
    /// Returns error if the request could not be written in full
    async fn append(&self, request: &AdmissionRequest) -> Result<(), StoreError>;

    /// Number of stored requests
    ///
    /// # Errors
    /// Returns error if the backing storage is unreadable
    async fn len(&self) -> Result<usize, StoreError>;

    /// Snapshot of all stored requests in append order
    ///
    /// # Errors
    /// Returns error if the backing storage is unreadable or corrupt
    async fn records(&self) -> Result<Vec<AdmissionRequest>, StoreError>;

    /// Release the store; later calls fail with [`StoreError::Closed`]
    ///
    /// # Errors
    /// Returns error if pending data could not be flushed
    async fn close(&self) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    records: Vec<AdmissionRequest>,
    closed: bool,
}

/// In-memory record store
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    inner: Mutex<MemoryState>,
}

impl MemoryRecordStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create store holding existing rows
    #[must_use]
    pub fn with_records(records: Vec<AdmissionRequest>) -> Self {
        Self {
            inner: Mutex::new(MemoryState {
                records,
                closed: false,
            }),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn append(&self, request: &AdmissionRequest) -> Result<(), StoreError> {
        let mut guard = self.inner.lock();
        if guard.closed {
            return Err(StoreError::Closed);
        }
        guard.records.push(request.clone());
        Ok(())
    }

    async fn len(&self) -> Result<usize, StoreError> {
        let guard = self.inner.lock();
        if guard.closed {
            return Err(StoreError::Closed);
        }
        Ok(guard.records.len())
    }

    async fn records(&self) -> Result<Vec<AdmissionRequest>, StoreError> {
        let guard = self.inner.lock();
        if guard.closed {
            return Err(StoreError::Closed);
        }
        Ok(guard.records.clone())
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.inner.lock().closed = true;
        Ok(())
    }
}
