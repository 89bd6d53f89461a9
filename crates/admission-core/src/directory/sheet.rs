//! Remote spreadsheet directory
//!
//! Fetches a values range (`{"values": [[header...], [row...]]}`) over
//! HTTP. Columns are located by header name, so the sheet may reorder
//! them freely. The parsed table is cached for a fixed TTL.

use super::{
    directory_from_rows, ActiveCell, ManagerDirectory, ManagerRow, StaticDirectory, COLUMN_ACTIVE,
    COLUMN_EMAIL, COLUMN_EMPLOYER, COLUMN_NAME, COLUMN_TAX_ID,
};
use crate::error::DirectoryError;
use crate::types::{ManagerProfile, NormalizedEmail};
use async_trait::async_trait;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Values range payload as served by spreadsheet APIs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SheetValues {
    /// Header row followed by data rows; trailing empty cells may be absent
    #[serde(default)]
    pub values: Vec<Vec<String>>,
}

impl SheetValues {
    /// Convert to a directory
    ///
    /// # Errors
    /// Returns error if a required column is missing from the header or a
    /// row is unusable
    pub fn into_directory(self) -> Result<StaticDirectory, DirectoryError> {
        let mut rows = self.values.into_iter();
        let Some(header) = rows.next() else {
            return Ok(StaticDirectory::new());
        };
        let columns = ColumnMap::from_header(&header)?;
        // Sheet row 1 is the header
        directory_from_rows(rows.map(|cells| columns.row(&cells)), 2)
    }
}

#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    email: usize,
    name: usize,
    employer: usize,
    tax_id: usize,
    active: usize,
}

impl ColumnMap {
    fn from_header(header: &[String]) -> Result<Self, DirectoryError> {
        let position = |name: &str| {
            header
                .iter()
                .position(|cell| cell.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| DirectoryError::Parse(format!("missing column: {name}")))
        };
        Ok(Self {
            email: position(COLUMN_EMAIL)?,
            name: position(COLUMN_NAME)?,
            employer: position(COLUMN_EMPLOYER)?,
            tax_id: position(COLUMN_TAX_ID)?,
            active: position(COLUMN_ACTIVE)?,
        })
    }

    fn row(&self, cells: &[String]) -> ManagerRow {
        let cell = |index: usize| cells.get(index).cloned().unwrap_or_default();
        ManagerRow {
            email: cell(self.email),
            name: cell(self.name),
            employer_name: cell(self.employer),
            employer_tax_id: cell(self.tax_id),
            active: ActiveCell::Text(cell(self.active)),
        }
    }
}

/// Directory backed by a remote spreadsheet
#[derive(Debug, Clone)]
pub struct SheetDirectory {
    url: String,
    client: reqwest::Client,
    cache: Cache<String, Arc<StaticDirectory>>,
}

impl SheetDirectory {
    /// Default snapshot lifetime
    pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

    /// Create directory for a values-range URL
    #[must_use]
    pub fn new(url: impl Into<String>, ttl: Duration) -> Self {
        Self::with_client(url, ttl, reqwest::Client::new())
    }

    /// Create directory with a preconfigured HTTP client
    #[must_use]
    pub fn with_client(url: impl Into<String>, ttl: Duration, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
            cache: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
        }
    }

    /// Source URL
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Drop the cached snapshot so the next lookup refetches
    pub fn invalidate(&self) {
        self.cache.invalidate_all();
    }

    async fn fetch(&self) -> Result<StaticDirectory, DirectoryError> {
        tracing::debug!(url = %self.url, "fetching manager sheet");
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| DirectoryError::Fetch(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Fetch(format!("status {status}")));
        }
        let values: SheetValues = response
            .json()
            .await
            .map_err(|e| DirectoryError::Parse(e.to_string()))?;
        let directory = values.into_directory()?;
        tracing::info!(
            managers = directory.len(),
            active = directory.active_count(),
            "manager sheet loaded"
        );
        Ok(directory)
    }

    async fn snapshot(&self) -> Result<Arc<StaticDirectory>, DirectoryError> {
        self.cache
            .try_get_with(self.url.clone(), async { self.fetch().await.map(Arc::new) })
            .await
            .map_err(|e: Arc<DirectoryError>| unshare(&e))
    }
}

/// Owned copy of a cached loader error, keeping its variant
///
/// `Io` cannot be cloned and never comes out of a fetch; it is reported as
/// `Fetch`.
fn unshare(err: &DirectoryError) -> DirectoryError {
    match err {
        DirectoryError::Parse(message) => DirectoryError::Parse(message.clone()),
        DirectoryError::InvalidRow { row, message } => DirectoryError::invalid_row(*row, message.clone()),
        DirectoryError::DuplicateManager(email) => DirectoryError::DuplicateManager(email.clone()),
        DirectoryError::Fetch(message) => DirectoryError::Fetch(message.clone()),
        DirectoryError::Io { .. } => DirectoryError::Fetch(err.to_string()),
    }
}

#[async_trait]
impl ManagerDirectory for SheetDirectory {
    async fn lookup(
        &self,
        email: &NormalizedEmail,
    ) -> Result<Option<ManagerProfile>, DirectoryError> {
        Ok(self.snapshot().await?.get(email).cloned())
    }
}
