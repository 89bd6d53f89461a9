//! Protocol ID generation
//!
//! IDs read `ADM-<year>-<seq>`. The sequence is derived from the record
//! store at generation time, never from a persisted counter:
//! - [`SequencePolicy::RowCount`]: total stored rows + 1
//! - [`SequencePolicy::YearMax`]: highest sequence issued this year + 1
//!
//! Two IDs generated before either request is persisted are equal.

use crate::clock::Clock;
use crate::error::StoreError;
use crate::store::RecordStore;
use crate::types::ProtocolId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How the sequence number is derived from stored records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SequencePolicy {
    /// Count every stored row, regardless of year
    #[default]
    RowCount,
    /// Continue from the highest sequence of the current year
    YearMax,
}

/// Generates protocol IDs from the record store's contents
#[derive(Debug, Clone)]
pub struct IdGenerator {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    policy: SequencePolicy,
}

impl IdGenerator {
    /// Create generator with the row-count policy
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            policy: SequencePolicy::default(),
        }
    }

    /// With sequence policy
    #[inline]
    #[must_use]
    pub fn with_policy(mut self, policy: SequencePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Active policy
    #[inline]
    #[must_use]
    pub fn policy(&self) -> SequencePolicy {
        self.policy
    }

    /// Compute the ID the next persisted request would receive
    ///
    /// # Errors
    /// Returns error if the record store cannot be read
    pub async fn next_id(&self) -> Result<ProtocolId, StoreError> {
        let year = self.clock.year();
        let last = match self.policy {
            SequencePolicy::RowCount => self.store.len().await?,
            SequencePolicy::YearMax => self
                .store
                .records()
                .await?
                .iter()
                .filter(|r| r.protocol_id.year() == year)
                .map(|r| r.protocol_id.seq() as usize)
                .max()
                .unwrap_or(0),
        };
        let seq = u32::try_from(last + 1).unwrap_or(u32::MAX);
        let id = ProtocolId::new(year, seq);
        tracing::debug!(protocol_id = %id, policy = ?self.policy, "protocol id computed");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRecordStore;
    use crate::types::{AdmissionForm, AdmissionRequest, ManagerProfile};
    use chrono::{NaiveDate, NaiveDateTime};
    use rust_decimal::Decimal;

    #[derive(Debug)]
    struct Pinned(NaiveDateTime);

    impl Clock for Pinned {
        fn now(&self) -> NaiveDateTime {
            self.0
        }
    }

    fn clock(year: i32) -> Arc<dyn Clock> {
        Arc::new(Pinned(
            NaiveDate::from_ymd_opt(year, 6, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
        ))
    }

    fn stored(year: i32, seq: u32) -> AdmissionRequest {
        let manager = ManagerProfile::new("ana@example.com", "Ana", "ACME", "1");
        let form = AdmissionForm {
            manager_email: "ana@example.com".into(),
            employee_name: "Joana".into(),
            employee_email: "joana@example.com".into(),
            job_title: "Analista".into(),
            monthly_salary: Decimal::ONE_THOUSAND,
            admission_date: NaiveDate::from_ymd_opt(year, 7, 1).unwrap(),
        };
        let at = NaiveDate::from_ymd_opt(year, 6, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        AdmissionRequest::new(ProtocolId::new(year, seq), &manager, &form, at)
    }

    #[tokio::test]
    async fn first_id_of_empty_store() {
        let generator = IdGenerator::new(Arc::new(MemoryRecordStore::new()), clock(2025));
        assert_eq!(generator.next_id().await.unwrap().to_string(), "ADM-2025-00001");
    }

    #[tokio::test]
    async fn repeated_calls_without_persist_collide() {
        let store = Arc::new(MemoryRecordStore::with_records(vec![stored(2025, 1)]));
        let generator = IdGenerator::new(store, clock(2025));
        let a = generator.next_id().await.unwrap();
        let b = generator.next_id().await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "ADM-2025-00002");
    }

    #[tokio::test]
    async fn row_count_spans_years() {
        let store = Arc::new(MemoryRecordStore::with_records(vec![
            stored(2024, 1),
            stored(2024, 2),
            stored(2024, 3),
        ]));
        let generator = IdGenerator::new(store, clock(2025));
        assert_eq!(generator.next_id().await.unwrap().to_string(), "ADM-2025-00004");
    }

    #[tokio::test]
    async fn row_count_reuses_after_removal() {
        // Row 2 removed out of band: the next ID repeats an issued one
        let store = Arc::new(MemoryRecordStore::with_records(vec![
            stored(2025, 1),
            stored(2025, 3),
        ]));
        let generator = IdGenerator::new(store, clock(2025));
        assert_eq!(generator.next_id().await.unwrap(), ProtocolId::new(2025, 3));
    }

    #[tokio::test]
    async fn year_max_restarts_each_year() {
        let store = Arc::new(MemoryRecordStore::with_records(vec![
            stored(2024, 1),
            stored(2024, 2),
        ]));
        let generator =
            IdGenerator::new(store, clock(2025)).with_policy(SequencePolicy::YearMax);
        assert_eq!(generator.next_id().await.unwrap().to_string(), "ADM-2025-00001");
    }

    #[tokio::test]
    async fn year_max_skips_gaps() {
        let store = Arc::new(MemoryRecordStore::with_records(vec![
            stored(2025, 1),
            stored(2025, 3),
        ]));
        let generator =
            IdGenerator::new(store, clock(2025)).with_policy(SequencePolicy::YearMax);
        assert_eq!(generator.next_id().await.unwrap(), ProtocolId::new(2025, 4));
    }

    #[test]
    fn policy_serde_names() {
        let policy: SequencePolicy = serde_json::from_str("\"year-max\"").unwrap();
        assert_eq!(policy, SequencePolicy::YearMax);
        assert_eq!(serde_json::to_string(&SequencePolicy::RowCount).unwrap(), "\"row-count\"");
    }
}
