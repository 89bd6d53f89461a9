//! Testing utilities for the admission intake workspace
//!
//! Shared test helpers, fixtures, and doubles.

#![allow(missing_docs)]

use admission_core::error::NotificationError;
use admission_core::{
    AdmissionForm, AdmissionRequest, AdmissionWorkflow, Clock, ManagerProfile, MemoryRecordStore,
    Notification, Notifier, ProtocolId, RecordStore, StaticDirectory,
};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::Arc;

pub const OPS_MAILBOX: &str = "rh@example.com";
pub const MANAGER_EMAIL: &str = "ana.souza@acme.com.br";
pub const INACTIVE_MANAGER_EMAIL: &str = "carlos@acme.com.br";

/// Clock pinned to a settable instant
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn at(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Noon on the given day
    pub fn on(year: i32, month: u32, day: u32) -> Self {
        Self::at(datetime(year, month, day))
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock()
    }
}

/// Notifier that keeps every message it is given
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotificationError> {
        self.sent.lock().push(notification.clone());
        Ok(())
    }
}

/// Notifier whose relay always refuses
#[derive(Debug, Default)]
pub struct FailingNotifier {
    attempts: Mutex<usize>,
}

impl FailingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock()
    }
}

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _notification: &Notification) -> Result<(), NotificationError> {
        *self.attempts.lock() += 1;
        Err(NotificationError::Transport("relay unavailable".into()))
    }
}

pub fn datetime(year: i32, month: u32, day: u32) -> NaiveDateTime {
    date(year, month, day).and_hms_opt(12, 0, 0).unwrap()
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn active_manager() -> ManagerProfile {
    ManagerProfile::new(
        MANAGER_EMAIL,
        "Ana Souza",
        "ACME Serviços Ltda",
        "12.345.678/0001-90",
    )
}

pub fn inactive_manager() -> ManagerProfile {
    ManagerProfile::new(
        INACTIVE_MANAGER_EMAIL,
        "Carlos Pereira",
        "ACME Serviços Ltda",
        "12.345.678/0001-90",
    )
    .with_active(false)
}

pub fn test_directory() -> StaticDirectory {
    StaticDirectory::from_profiles([active_manager(), inactive_manager()]).unwrap()
}

/// Valid form for `manager_email`, admission one week after `today`
pub fn form_for(manager_email: &str, today: NaiveDate) -> AdmissionForm {
    AdmissionForm {
        manager_email: manager_email.to_string(),
        employee_name: "Joana Lima".to_string(),
        employee_email: "joana.lima@example.com".to_string(),
        job_title: "Analista de Suporte".to_string(),
        monthly_salary: Decimal::new(450_000, 2),
        admission_date: today + chrono::Duration::days(7),
    }
}

/// Stored request with the given ID, as if created on `submitted_at`
pub fn stored_request(protocol_id: ProtocolId, submitted_at: NaiveDateTime) -> AdmissionRequest {
    let form = form_for(MANAGER_EMAIL, submitted_at.date());
    AdmissionRequest::new(protocol_id, &active_manager(), &form, submitted_at)
}

/// Workflow over the test directory and an in-memory store
pub struct TestHarness {
    pub workflow: AdmissionWorkflow,
    pub store: Arc<MemoryRecordStore>,
    pub clock: Arc<FixedClock>,
}

pub fn workflow_with(notifier: Arc<dyn Notifier>, clock: Arc<FixedClock>) -> TestHarness {
    workflow_with_store(notifier, clock, Arc::new(MemoryRecordStore::new()))
}

pub fn workflow_with_store(
    notifier: Arc<dyn Notifier>,
    clock: Arc<FixedClock>,
    store: Arc<MemoryRecordStore>,
) -> TestHarness {
    let records: Arc<dyn RecordStore> = store.clone();
    let time: Arc<dyn Clock> = clock.clone();
    let workflow = AdmissionWorkflow::new(Arc::new(test_directory()), records, notifier, OPS_MAILBOX)
        .with_clock(time);
    TestHarness {
        workflow,
        store,
        clock,
    }
}
