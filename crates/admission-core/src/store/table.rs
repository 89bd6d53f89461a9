//! Tabular record store
//!
//! One request per row of a CSV file with a header row naming every
//! [`AdmissionRequest`] field. The file opens directly in a spreadsheet and
//! is the same layout mailed as the snapshot attachment.

use super::{file, RecordStore};
use crate::error::StoreError;
use crate::types::{AdmissionRequest, ProtocolId};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

/// Column order of the stored table
pub const COLUMNS: [&str; 11] = [
    "protocol_id",
    "employer_name",
    "employer_tax_id",
    "manager_name",
    "manager_email",
    "employee_name",
    "employee_email",
    "job_title",
    "monthly_salary",
    "admission_date",
    "submitted_at",
];

/// Encode requests as CSV rows, optionally preceded by the header row
///
/// # Errors
/// Returns error if a row cannot be encoded
pub fn encode_csv(records: &[AdmissionRequest], with_header: bool) -> Result<String, StoreError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    if with_header {
        writer.write_record(COLUMNS)?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| StoreError::Csv(e.into_error().into()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Row as read back; salary stays text until parsed as a decimal
#[derive(Debug, Deserialize)]
struct Row {
    protocol_id: ProtocolId,
    employer_name: String,
    employer_tax_id: String,
    manager_name: String,
    manager_email: String,
    employee_name: String,
    employee_email: String,
    job_title: String,
    monthly_salary: String,
    admission_date: NaiveDate,
    submitted_at: NaiveDateTime,
}

impl TryFrom<Row> for AdmissionRequest {
    type Error = String;

    fn try_from(row: Row) -> Result<Self, Self::Error> {
        let monthly_salary = Decimal::from_str(row.monthly_salary.trim())
            .map_err(|e| format!("invalid monthly_salary '{}': {e}", row.monthly_salary))?;
        Ok(Self {
            protocol_id: row.protocol_id,
            employer_name: row.employer_name,
            employer_tax_id: row.employer_tax_id,
            manager_name: row.manager_name,
            manager_email: row.manager_email,
            employee_name: row.employee_name,
            employee_email: row.employee_email,
            job_title: row.job_title,
            monthly_salary,
            admission_date: row.admission_date,
            submitted_at: row.submitted_at,
        })
    }
}

/// Record store backed by a `.csv` file
#[derive(Debug)]
pub struct CsvRecordStore {
    path: PathBuf,
    closed: AtomicBool,
}

impl CsvRecordStore {
    /// Open the store, creating the file and its parent directories
    ///
    /// An unterminated last row left by an interrupted write is dropped.
    ///
    /// # Errors
    /// Returns error if the file cannot be created or opened
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        file::prepare(&path).await?;
        tracing::debug!(path = %path.display(), "csv record store opened");
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

    /// Header row and data rows, each row with the line it starts on
    async fn table(&self) -> Result<(csv::StringRecord, Vec<(usize, csv::StringRecord)>), StoreError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| StoreError::io_error(&self.path, e))?;
        let text = file::complete_lines(&self.path, &text);
        let line_of = |position: Option<&csv::Position>| {
            position.map_or(0, |p| usize::try_from(p.line()).unwrap_or(usize::MAX))
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(text.as_bytes());
        let mut rows = Vec::new();
        let mut record = csv::StringRecord::new();
        loop {
            match reader.read_record(&mut record) {
                Ok(false) => break,
                Ok(true) => rows.push((line_of(record.position()), record.clone())),
                Err(e) => {
                    return Err(StoreError::Corrupt {
                        line: line_of(e.position()),
                        message: e.to_string(),
                    })
                }
            }
        }
        let header = reader.headers()?.clone();
        Ok((header, rows))
    }
}

#[async_trait]
impl RecordStore for CsvRecordStore {
    async fn append(&self, request: &AdmissionRequest) -> Result<(), StoreError> {
        self.ensure_open()?;
        let row = encode_csv(std::slice::from_ref(request), false)?;
        let header = encode_csv(&[], true)?;
        file::append(&self.path, Some(header.as_bytes()), row.as_bytes()).await
    }

    async fn len(&self) -> Result<usize, StoreError> {
        self.ensure_open()?;
        Ok(self.table().await?.1.len())
    }

    async fn records(&self) -> Result<Vec<AdmissionRequest>, StoreError> {
        self.ensure_open()?;
        let (header, rows) = self.table().await?;
        rows.into_iter()
            .map(|(line, record)| {
                let corrupt = |message: String| StoreError::Corrupt { line, message };
                let row: Row = record
                    .deserialize(Some(&header))
                    .map_err(|e| corrupt(e.to_string()))?;
                AdmissionRequest::try_from(row).map_err(corrupt)
            })
            .collect()
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        tracing::debug!(path = %self.path.display(), "csv record store closed");
        Ok(())
    }
}
