//! Manager directory
//!
//! The allow-list that maps a manager's e-mail to their profile:
//! - [`StaticDirectory`]: in-memory map, also the shared lookup table
//! - [`TableDirectory`]: local JSON/YAML table file
//! - [`SheetDirectory`]: remote spreadsheet values range over HTTP
//!
//! Every backend answers the same [`ManagerDirectory::lookup`] contract:
//! only active profiles match, and an inactive profile is
//! indistinguishable from an unknown one.

mod sheet;
mod table;

pub use sheet::{SheetDirectory, SheetValues};
pub use table::TableDirectory;

use crate::error::DirectoryError;
use crate::types::{ManagerProfile, NormalizedEmail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;

/// Manager e-mail column
pub const COLUMN_EMAIL: &str = "email_gestor";
/// Manager name column
pub const COLUMN_NAME: &str = "nome_gestor";
/// Employer name column
pub const COLUMN_EMPLOYER: &str = "empresa";
/// Employer tax ID column
pub const COLUMN_TAX_ID: &str = "cnpj";
/// Active flag column
pub const COLUMN_ACTIVE: &str = "ativo";

/// Lookup contract shared by every directory backend
#[async_trait]
pub trait ManagerDirectory: Send + Sync + Debug {
    /// Find an active profile by normalized e-mail
    ///
    /// # Errors
    /// Returns error only when the backend itself fails; an unknown or
    /// inactive manager is `Ok(None)`.
    async fn lookup(
        &self,
        email: &NormalizedEmail,
    ) -> Result<Option<ManagerProfile>, DirectoryError>;
}

/// In-memory directory keyed by normalized e-mail
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    profiles: HashMap<NormalizedEmail, ManagerProfile>,
}

impl StaticDirectory {
    /// Create empty directory
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from profiles, rejecting duplicate keys
    ///
    /// # Errors
    /// Returns error if two profiles share a normalized e-mail or a
    /// profile has a blank e-mail
    pub fn from_profiles(
        profiles: impl IntoIterator<Item = ManagerProfile>,
    ) -> Result<Self, DirectoryError> {
        let mut directory = Self::new();
        for (index, profile) in profiles.into_iter().enumerate() {
            directory.insert(index + 1, profile)?;
        }
        Ok(directory)
    }

    fn insert(&mut self, row: usize, profile: ManagerProfile) -> Result<(), DirectoryError> {
        let key = profile
            .key()
            .ok_or_else(|| DirectoryError::invalid_row(row, "blank manager e-mail"))?;
        if self.profiles.contains_key(&key) {
            return Err(DirectoryError::DuplicateManager(key.to_string()));
        }
        self.profiles.insert(key, profile);
        Ok(())
    }

    /// Synchronous lookup, active profiles only
    #[must_use]
    pub fn get(&self, email: &NormalizedEmail) -> Option<&ManagerProfile> {
        self.profiles.get(email).filter(|profile| profile.active)
    }

    /// Number of profiles, active or not
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Check if directory is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Number of active profiles
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.profiles.values().filter(|p| p.active).count()
    }

    /// Iterate all profiles
    pub fn profiles(&self) -> impl Iterator<Item = &ManagerProfile> {
        self.profiles.values()
    }
}

#[async_trait]
impl ManagerDirectory for StaticDirectory {
    async fn lookup(
        &self,
        email: &NormalizedEmail,
    ) -> Result<Option<ManagerProfile>, DirectoryError> {
        Ok(self.get(email).cloned())
    }
}

/// Boolean-like cell of the `ativo` column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActiveCell {
    /// Native boolean (YAML/JSON)
    Bool(bool),
    /// Numeric flag
    Number(i64),
    /// Free text such as "sim" or "x"
    Text(String),
}

impl ActiveCell {
    /// Interpret the cell, `None` when unrecognized
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Number(1) => Some(true),
            Self::Number(0) => Some(false),
            Self::Number(_) => None,
            Self::Text(text) => parse_active(text),
        }
    }
}

impl Default for ActiveCell {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

/// Parse the common spellings of an active flag
#[must_use]
pub fn parse_active(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" | "sim" | "s" | "x" | "ativo" | "verdadeiro" => {
            Some(true)
        }
        "false" | "f" | "0" | "no" | "n" | "não" | "nao" | "" | "inativo" | "falso" => {
            Some(false)
        }
        _ => None,
    }
}

/// One row of the manager table, column names as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerRow {
    #[serde(rename = "email_gestor", default)]
    pub email: String,
    #[serde(rename = "nome_gestor", default)]
    pub name: String,
    #[serde(rename = "empresa", default)]
    pub employer_name: String,
    #[serde(rename = "cnpj", default)]
    pub employer_tax_id: String,
    #[serde(rename = "ativo", default)]
    pub active: ActiveCell,
}

impl ManagerRow {
    /// Convert to a profile, `None` for rows without an e-mail
    ///
    /// # Errors
    /// Returns error if the active flag is unrecognized
    pub fn into_profile(self, row: usize) -> Result<Option<ManagerProfile>, DirectoryError> {
        if self.email.trim().is_empty() {
            tracing::warn!(row, "skipping manager row without e-mail");
            return Ok(None);
        }
        let active = self.active.as_bool().ok_or_else(|| {
            DirectoryError::invalid_row(row, format!("unrecognized ativo value {:?}", self.active))
        })?;
        Ok(Some(ManagerProfile {
            email: self.email.trim().to_string(),
            display_name: self.name.trim().to_string(),
            employer_name: self.employer_name.trim().to_string(),
            employer_tax_id: self.employer_tax_id.trim().to_string(),
            active,
        }))
    }
}

/// Build a directory from table rows; `first_row` is the row number of
/// the first entry in the source, used in error messages
///
/// # Errors
/// Returns error on unusable rows or duplicate e-mails
pub fn directory_from_rows(
    rows: impl IntoIterator<Item = ManagerRow>,
    first_row: usize,
) -> Result<StaticDirectory, DirectoryError> {
    let mut directory = StaticDirectory::new();
    for (offset, row) in rows.into_iter().enumerate() {
        let number = first_row + offset;
        if let Some(profile) = row.into_profile(number)? {
            directory.insert(number, profile)?;
        }
    }
    Ok(directory)
}
