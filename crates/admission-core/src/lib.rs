//! Admission Intake Core
//!
//! Manager-authorized admission requests:
//! - Resolves the submitting manager against an allow-list directory
//! - Validates the new hire's details
//! - Assigns a sequential protocol ID (`ADM-<year>-<seq>`)
//! - Appends the request to an append-only record store
//! - Notifies a fixed operational mailbox
//!
//! # Example
//!
//! ```rust,ignore
//! use admission_core::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let directory = StaticDirectory::from_profiles([
//!     ManagerProfile::new("ana@example.com", "Ana", "ACME", "11.111.111/0001-11"),
//! ])?;
//! let store = Arc::new(MemoryRecordStore::new());
//! let workflow = AdmissionWorkflow::new(
//!     Arc::new(directory),
//!     store,
//!     Arc::new(LogNotifier),
//!     "rh@example.com",
//! );
//!
//! match workflow.submit(&form).await? {
//!     SubmissionOutcome::Created(receipt) => println!("protocol {}", receipt.protocol_id),
//!     SubmissionOutcome::Rejected(reason) => println!("rejected: {reason}"),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod clock;
pub mod config;
pub mod directory;
pub mod error;
pub mod id;
pub mod notifier;
pub mod resolver;
pub mod store;
pub mod types;
pub mod workflow;

// Re-exports for convenience
pub use clock::{Clock, SystemClock};
pub use config::{AdmissionConfig, DirectoryConfig, NotifierConfig, StoreConfig, StoreFormat};
pub use directory::{
    ManagerDirectory, SheetDirectory, SheetValues, StaticDirectory, TableDirectory,
};
pub use error::{
    ConfigError, DirectoryError, NotificationError, SetupError, StoreError, SubmissionError,
};
pub use id::{IdGenerator, SequencePolicy};
pub use notifier::{
    render_notification, Attachment, LogNotifier, Notification, Notifier, OutboxNotifier,
    WebhookNotifier,
};
pub use resolver::{IdentityResolver, Resolution};
pub use store::{CsvRecordStore, JsonlRecordStore, MemoryRecordStore, RecordStore};
pub use types::{AdmissionForm, AdmissionRequest, ManagerProfile, NormalizedEmail, ProtocolId};
pub use workflow::{
    AdmissionWorkflow, FieldError, FormField, NotificationStatus, Receipt, Rejection,
    SubmissionOutcome,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with admission intake
    pub use crate::{
        AdmissionConfig, AdmissionForm, AdmissionWorkflow, LogNotifier, ManagerDirectory,
        ManagerProfile, MemoryRecordStore, Notifier, ProtocolId, RecordStore, Rejection,
        StaticDirectory, SubmissionOutcome,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
