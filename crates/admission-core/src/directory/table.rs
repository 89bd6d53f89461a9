//! Local manager table
//!
//! Reads a list of rows (`email_gestor`, `nome_gestor`, `empresa`, `cnpj`,
//! `ativo`) from a JSON or YAML file. The table is loaded on open and can
//! be re-read with [`TableDirectory::reload`] after an administrator edits
//! it.

use super::{directory_from_rows, ManagerDirectory, ManagerRow, StaticDirectory};
use crate::error::DirectoryError;
use crate::types::{ManagerProfile, NormalizedEmail};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};

/// Supported table encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableFormat {
    Json,
    Yaml,
}

impl TableFormat {
    fn from_path(path: &Path) -> Result<Self, DirectoryError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            other => Err(DirectoryError::Parse(format!(
                "unsupported table extension: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }

    fn parse(self, text: &str) -> Result<Vec<ManagerRow>, DirectoryError> {
        match self {
            Self::Json => serde_json::from_str(text).map_err(|e| DirectoryError::Parse(e.to_string())),
            Self::Yaml => serde_yaml::from_str(text).map_err(|e| DirectoryError::Parse(e.to_string())),
        }
    }
}

/// Directory backed by a local table file
#[derive(Debug)]
pub struct TableDirectory {
    path: PathBuf,
    format: TableFormat,
    inner: RwLock<StaticDirectory>,
}

impl TableDirectory {
    /// Open and load a table file
    ///
    /// # Errors
    /// Returns error if the file is unreadable, has an unsupported
    /// extension, or contains invalid or duplicate rows
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, DirectoryError> {
        let path = path.into();
        let format = TableFormat::from_path(&path)?;
        let directory = Self::read(&path, format).await?;
        tracing::info!(
            path = %path.display(),
            managers = directory.len(),
            active = directory.active_count(),
            "manager table loaded"
        );
        Ok(Self {
            path,
            format,
            inner: RwLock::new(directory),
        })
    }

    async fn read(path: &Path, format: TableFormat) -> Result<StaticDirectory, DirectoryError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DirectoryError::io_error(path, e))?;
        let rows = format.parse(&text)?;
        directory_from_rows(rows, 1)
    }

    /// Re-read the table; the previous contents stay in place on error
    ///
    /// # Errors
    /// Returns the same errors as [`TableDirectory::open`]
    pub async fn reload(&self) -> Result<usize, DirectoryError> {
        let directory = Self::read(&self.path, self.format).await?;
        let count = directory.len();
        *self.inner.write() = directory;
        tracing::debug!(path = %self.path.display(), managers = count, "manager table reloaded");
        Ok(count)
    }

    /// Path of the backing file
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of loaded profiles
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Check if table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

#[async_trait]
impl ManagerDirectory for TableDirectory {
    async fn lookup(
        &self,
        email: &NormalizedEmail,
    ) -> Result<Option<ManagerProfile>, DirectoryError> {
        Ok(self.inner.read().get(email).cloned())
    }
}
