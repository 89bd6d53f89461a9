//! Submission workflow
//!
//! One pass per submission, no retries:
//! 1. Identify the manager
//! 2. Validate the form
//! 3. Assign a protocol ID
//! 4. Append the request to the record store
//! 5. Notify the operational mailbox
//!
//! Steps 1 and 2 end in [`SubmissionOutcome::Rejected`] with nothing
//! written. A store failure in step 4 aborts with an error. A delivery
//! failure in step 5 is reported in the receipt; the record stays.

use crate::clock::{Clock, SystemClock};
use crate::directory::ManagerDirectory;
use crate::error::{StoreError, SubmissionError};
use crate::id::{IdGenerator, SequencePolicy};
use crate::notifier::{render_notification, Attachment, Notification, Notifier};
use crate::resolver::{IdentityResolver, Resolution};
use crate::store::RecordStore;
use crate::types::{AdmissionForm, AdmissionRequest, ProtocolId};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Form fields subject to validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormField {
    EmployeeName,
    EmployeeEmail,
    JobTitle,
    MonthlySalary,
    AdmissionDate,
}

impl FormField {
    /// Field name as used in the form
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::EmployeeName => "employee_name",
            Self::EmployeeEmail => "employee_email",
            Self::JobTitle => "job_title",
            Self::MonthlySalary => "monthly_salary",
            Self::AdmissionDate => "admission_date",
        }
    }
}

/// One failed validation rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: FormField,
    pub message: String,
}

impl FieldError {
    fn new(field: FormField, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field.name(), self.message)
    }
}

/// Why a submission was turned away
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "fields", rename_all = "snake_case")]
pub enum Rejection {
    /// E-mail unknown or manager inactive
    UnauthorizedManager,
    /// One or more fields failed validation
    Invalid(Vec<FieldError>),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnauthorizedManager => f.write_str("manager e-mail is not authorized"),
            Self::Invalid(errors) => {
                f.write_str("invalid form: ")?;
                for (index, error) in errors.iter().enumerate() {
                    if index > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{error}")?;
                }
                Ok(())
            }
        }
    }
}

/// Delivery result of the notification step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum NotificationStatus {
    /// Accepted by the notifier
    Delivered,
    /// Notifier failed; the request is stored regardless
    Failed(String),
}

impl NotificationStatus {
    /// Check if delivery succeeded
    #[inline]
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// Proof of a created request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Receipt {
    pub protocol_id: ProtocolId,
    pub request: AdmissionRequest,
    pub notification: NotificationStatus,
}

/// Terminal outcome of one submission
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    /// Request stored
    Created(Receipt),
    /// Nothing stored
    Rejected(Rejection),
}

impl SubmissionOutcome {
    /// Protocol ID of a created request
    #[inline]
    #[must_use]
    pub fn protocol_id(&self) -> Option<ProtocolId> {
        match self {
            Self::Created(receipt) => Some(receipt.protocol_id),
            Self::Rejected(_) => None,
        }
    }

    /// Rejection reason, if rejected
    #[inline]
    #[must_use]
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Created(_) => None,
            Self::Rejected(rejection) => Some(rejection),
        }
    }
}

/// Check the form's required fields against `today`
#[must_use]
pub fn validate_form(form: &AdmissionForm, today: NaiveDate) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if form.employee_name.trim().is_empty() {
        errors.push(FieldError::new(FormField::EmployeeName, "is required"));
    }
    if form.employee_email.trim().is_empty() {
        errors.push(FieldError::new(FormField::EmployeeEmail, "is required"));
    }
    if form.job_title.trim().is_empty() {
        errors.push(FieldError::new(FormField::JobTitle, "is required"));
    }
    if form.monthly_salary <= Decimal::ZERO {
        errors.push(FieldError::new(FormField::MonthlySalary, "must be greater than zero"));
    }
    if form.admission_date <= today {
        errors.push(FieldError::new(
            FormField::AdmissionDate,
            format!("must be after {}", today.format("%Y-%m-%d")),
        ));
    }
    errors
}

/// Orchestrates identity, validation, persistence and notification
#[derive(Debug, Clone)]
pub struct AdmissionWorkflow {
    resolver: IdentityResolver,
    store: Arc<dyn RecordStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    recipient: String,
    policy: SequencePolicy,
    attach_snapshot: bool,
}

impl AdmissionWorkflow {
    /// Create workflow with the system clock, row-count IDs and no
    /// snapshot attachment
    #[must_use]
    pub fn new(
        directory: Arc<dyn ManagerDirectory>,
        store: Arc<dyn RecordStore>,
        notifier: Arc<dyn Notifier>,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            resolver: IdentityResolver::new(directory),
            store,
            notifier,
            clock: Arc::new(SystemClock),
            recipient: recipient.into(),
            policy: SequencePolicy::default(),
            attach_snapshot: false,
        }
    }

    /// With clock
    #[inline]
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// With sequence policy
    #[inline]
    #[must_use]
    pub fn with_sequence_policy(mut self, policy: SequencePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// With record store snapshot attached to notifications
    #[inline]
    #[must_use]
    pub fn with_attach_snapshot(mut self, attach: bool) -> Self {
        self.attach_snapshot = attach;
        self
    }

    /// Identity resolver in use
    #[inline]
    #[must_use]
    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    /// Record store in use
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Operational mailbox
    #[inline]
    #[must_use]
    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    fn id_generator(&self) -> IdGenerator {
        IdGenerator::new(Arc::clone(&self.store), Arc::clone(&self.clock)).with_policy(self.policy)
    }

    /// ID the next created request would receive
    ///
    /// # Errors
    /// Returns error if the record store cannot be read
    pub async fn next_id(&self) -> Result<ProtocolId, StoreError> {
        self.id_generator().next_id().await
    }

    /// Run one submission
    ///
    /// # Errors
    /// Returns error if the directory backend fails or the request cannot
    /// be stored. Authorization and validation failures are
    /// [`SubmissionOutcome::Rejected`], not errors.
    pub async fn submit(&self, form: &AdmissionForm) -> Result<SubmissionOutcome, SubmissionError> {
        // 1. Identify
        let manager = match self.resolver.resolve(&form.manager_email).await? {
            Resolution::Authorized(profile) => profile,
            Resolution::Unauthorized => {
                tracing::warn!(manager_email = %form.manager_email.trim(), "submission rejected: unauthorized manager");
                return Ok(SubmissionOutcome::Rejected(Rejection::UnauthorizedManager));
            }
        };

        // 2. Validate
        let now = self.clock.now();
        let errors = validate_form(form, now.date());
        if !errors.is_empty() {
            let rejection = Rejection::Invalid(errors);
            tracing::warn!(manager_email = %manager.email, %rejection, "submission rejected");
            return Ok(SubmissionOutcome::Rejected(rejection));
        }

        // 3. Assign ID
        let protocol_id = self.id_generator().next_id().await?;

        // 4. Persist
        let request = AdmissionRequest::new(protocol_id, &manager, form, now);
        self.store.append(&request).await?;
        tracing::info!(
            protocol_id = %protocol_id,
            manager_email = %manager.email,
            employer = %manager.employer_name,
            "admission request created"
        );

        // 5. Notify
        let notification = self.notification_for(&request).await;
        let status = match self.notifier.notify(&notification).await {
            Ok(()) => NotificationStatus::Delivered,
            Err(e) => {
                tracing::warn!(protocol_id = %protocol_id, error = %e, "notification failed; request kept");
                NotificationStatus::Failed(e.to_string())
            }
        };

        Ok(SubmissionOutcome::Created(Receipt {
            protocol_id,
            request,
            notification: status,
        }))
    }

    async fn notification_for(&self, request: &AdmissionRequest) -> Notification {
        let attachment = if self.attach_snapshot {
            match self.store.records().await {
                Ok(records) => match Attachment::snapshot(&records) {
                    Ok(attachment) => Some(attachment),
                    Err(e) => {
                        tracing::warn!(error = %e, "snapshot encoding failed; sending without attachment");
                        None
                    }
                },
                Err(e) => {
                    tracing::warn!(error = %e, "snapshot read failed; sending without attachment");
                    None
                }
            }
        } else {
            None
        };
        render_notification(request, &self.recipient, attachment)
    }

    /// Close the record store
    ///
    /// # Errors
    /// Returns error if the store fails to close cleanly
    pub async fn close(&self) -> Result<(), StoreError> {
        self.store.close().await
    }
}
