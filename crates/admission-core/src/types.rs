//! Core types for admission intake
//!
//! Defines the fundamental data model:
//! - Normalized manager e-mail keys
//! - Manager profiles from the directory
//! - Raw admission form input
//! - Persisted admission requests and their protocol IDs

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix shared by every protocol ID
pub const PROTOCOL_PREFIX: &str = "ADM";

/// Minimum width of the zero-padded sequence
pub const SEQUENCE_WIDTH: usize = 5;

/// Trimmed, lower-cased e-mail used as the directory key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedEmail(String);

impl NormalizedEmail {
    /// Normalize raw input, `None` when nothing is left after trimming
    #[must_use]
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_lowercase()))
    }

    /// Get the normalized string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Manager identity and employer record
///
/// Maintained by an administrative process; read-only to submissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerProfile {
    /// Directory key, stored as entered
    pub email: String,
    /// Manager's display name
    pub display_name: String,
    /// Client company name
    pub employer_name: String,
    /// Client company tax ID (CNPJ)
    pub employer_tax_id: String,
    /// Whether the manager may submit requests
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl ManagerProfile {
    /// Create an active profile
    pub fn new(
        email: impl Into<String>,
        display_name: impl Into<String>,
        employer_name: impl Into<String>,
        employer_tax_id: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            display_name: display_name.into(),
            employer_name: employer_name.into(),
            employer_tax_id: employer_tax_id.into(),
            active: true,
        }
    }

    /// With active flag
    #[inline]
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Normalized key of this profile
    #[inline]
    #[must_use]
    pub fn key(&self) -> Option<NormalizedEmail> {
        NormalizedEmail::new(&self.email)
    }
}

/// Raw input of one submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionForm {
    /// E-mail the manager identifies with
    pub manager_email: String,
    /// New hire's full name
    pub employee_name: String,
    /// New hire's e-mail
    pub employee_email: String,
    /// Position being filled
    pub job_title: String,
    /// Fixed monthly salary
    pub monthly_salary: Decimal,
    /// First working day
    pub admission_date: NaiveDate,
}

/// Persisted admission request
///
/// Manager fields are copied from the profile at submission time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionRequest {
    pub protocol_id: ProtocolId,
    pub employer_name: String,
    pub employer_tax_id: String,
    pub manager_name: String,
    pub manager_email: String,
    pub employee_name: String,
    pub employee_email: String,
    pub job_title: String,
    pub monthly_salary: Decimal,
    pub admission_date: NaiveDate,
    pub submitted_at: NaiveDateTime,
}

impl AdmissionRequest {
    /// Build a request from an authorized profile and validated form
    #[must_use]
    pub fn new(
        protocol_id: ProtocolId,
        manager: &ManagerProfile,
        form: &AdmissionForm,
        submitted_at: NaiveDateTime,
    ) -> Self {
        Self {
            protocol_id,
            employer_name: manager.employer_name.clone(),
            employer_tax_id: manager.employer_tax_id.clone(),
            manager_name: manager.display_name.clone(),
            manager_email: manager.email.clone(),
            employee_name: form.employee_name.trim().to_string(),
            employee_email: form.employee_email.trim().to_string(),
            job_title: form.job_title.trim().to_string(),
            monthly_salary: form.monthly_salary,
            admission_date: form.admission_date,
            submitted_at,
        }
    }
}

/// Human-readable request identifier, `ADM-<year>-<seq>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProtocolId {
    year: i32,
    seq: u32,
}

impl ProtocolId {
    /// Create from year and sequence
    #[inline]
    #[must_use]
    pub fn new(year: i32, seq: u32) -> Self {
        Self { year, seq }
    }

    /// Calendar year of issue
    #[inline]
    #[must_use]
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Sequence number within the ID
    #[inline]
    #[must_use]
    pub fn seq(&self) -> u32 {
        self.seq
    }
}

impl fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{PROTOCOL_PREFIX}-{}-{:0width$}",
            self.year,
            self.seq,
            width = SEQUENCE_WIDTH
        )
    }
}

/// Protocol ID parse failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid protocol id: '{0}'")]
pub struct ProtocolIdError(pub String);

impl FromStr for ProtocolId {
    type Err = ProtocolIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProtocolIdError(s.to_string());
        let mut parts = s.splitn(3, '-');
        if parts.next() != Some(PROTOCOL_PREFIX) {
            return Err(invalid());
        }
        let year = parts
            .next()
            .filter(|y| y.len() == 4 && y.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|y| y.parse::<i32>().ok())
            .ok_or_else(invalid)?;
        let seq = parts
            .next()
            .filter(|q| q.len() >= SEQUENCE_WIDTH && q.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|q| q.parse::<u32>().ok())
            .ok_or_else(invalid)?;
        Ok(Self { year, seq })
    }
}

impl TryFrom<String> for ProtocolId {
    type Error = ProtocolIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProtocolId> for String {
    fn from(value: ProtocolId) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn normalized_email_trims_and_lowercases() {
        let email = NormalizedEmail::new("  Ana@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "ana@example.com");
    }

    #[test]
    fn normalized_email_rejects_blank() {
        assert!(NormalizedEmail::new("   ").is_none());
        assert!(NormalizedEmail::new("").is_none());
    }

    #[test]
    fn protocol_id_formats_with_padding() {
        assert_eq!(ProtocolId::new(2025, 1).to_string(), "ADM-2025-00001");
        assert_eq!(ProtocolId::new(2025, 42).to_string(), "ADM-2025-00042");
        assert_eq!(ProtocolId::new(2025, 123_456).to_string(), "ADM-2025-123456");
    }

    #[test]
    fn protocol_id_parses() {
        let id: ProtocolId = "ADM-2024-00917".parse().unwrap();
        assert_eq!(id.year(), 2024);
        assert_eq!(id.seq(), 917);
    }

    #[test]
    fn protocol_id_rejects_malformed() {
        for bad in [
            "",
            "ADM",
            "ADM-24-00001",
            "REQ-2024-00001",
            "ADM-2024-1",
            "ADM-2024-0000x",
            "ADM-+202-00001",
            "ADM--202-00001",
        ] {
            assert!(bad.parse::<ProtocolId>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn protocol_id_serializes_as_string() {
        let json = serde_json::to_string(&ProtocolId::new(2026, 7)).unwrap();
        assert_eq!(json, "\"ADM-2026-00007\"");
        let back: ProtocolId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ProtocolId::new(2026, 7));
    }

    #[test]
    fn profile_defaults_active_when_missing() {
        let profile: ManagerProfile = serde_json::from_str(
            r#"{"email":"a@b.c","display_name":"A","employer_name":"E","employer_tax_id":"1"}"#,
        )
        .unwrap();
        assert!(profile.active);
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(raw in "[ ]{0,3}[A-Za-z0-9._]{1,12}@[A-Za-z]{1,8}\\.[A-Za-z]{2,3}[ ]{0,3}") {
            let once = NormalizedEmail::new(&raw).unwrap();
            let twice = NormalizedEmail::new(once.as_str()).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn normalization_ignores_case(raw in "[A-Za-z0-9]{1,12}@[A-Za-z]{1,8}\\.com") {
            prop_assert_eq!(
                NormalizedEmail::new(&raw.to_uppercase()),
                NormalizedEmail::new(&raw.to_lowercase())
            );
        }

        #[test]
        fn protocol_id_display_parses_back(year in 2000i32..2100, seq in 1u32..1_000_000) {
            let id = ProtocolId::new(year, seq);
            prop_assert_eq!(id.to_string().parse::<ProtocolId>().unwrap(), id);
        }
    }
}
