//! Error types for admission intake
//!
//! Provides error handling for:
//! - Manager directory loading and lookups
//! - Record store persistence
//! - Notification delivery
//! - Configuration loading
//! - Submission failures that abort the workflow
//!
//! Authorization and validation failures are not errors: they are
//! terminal outcomes, see [`crate::workflow::Rejection`].

use std::path::PathBuf;

/// Manager directory errors
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// IO error while reading a local table
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Table content could not be decoded
    #[error("failed to parse manager table: {0}")]
    Parse(String),

    /// A row carries an unusable value
    #[error("invalid manager row {row}: {message}")]
    InvalidRow { row: usize, message: String },

    /// Two rows normalize to the same e-mail
    #[error("duplicate manager e-mail: {0}")]
    DuplicateManager(String),

    /// Remote sheet could not be fetched
    #[error("failed to fetch manager sheet: {0}")]
    Fetch(String),
}

impl DirectoryError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create invalid row error
    pub fn invalid_row(row: usize, message: impl Into<String>) -> Self {
        Self::InvalidRow {
            row,
            message: message.into(),
        }
    }
}

/// Record store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// IO error on the backing file
    #[error("io error on record store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored line could not be decoded
    #[error("corrupt record at line {line}: {message}")]
    Corrupt { line: usize, message: String },

    /// A record could not be encoded
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A tabular row could not be encoded or decoded
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Store was used after close
    #[error("record store is closed")]
    Closed,
}

impl StoreError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Notification delivery errors
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// Outbox write failed
    #[error("io error writing notification {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Message could not be encoded
    #[error("failed to serialize notification: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Snapshot attachment could not be built
    #[error("failed to build snapshot attachment: {0}")]
    Snapshot(#[from] StoreError),

    /// Relay could not be reached
    #[error("notification transport failed: {0}")]
    Transport(String),

    /// Relay answered with a failure status
    #[error("notification relay rejected message with status {status}")]
    Rejected { status: u16 },
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("io error reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for the schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config parsed but is inconsistent
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failures while assembling the workflow from configuration
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// Configuration is unusable
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Manager directory could not be opened
    #[error("directory setup failed: {0}")]
    Directory(#[from] DirectoryError),

    /// Record store could not be opened
    #[error("record store setup failed: {0}")]
    Store(#[from] StoreError),

    /// Notifier could not be built
    #[error("notifier setup failed: {0}")]
    Notifier(#[from] NotificationError),
}

/// Failures that abort a submission
///
/// Nothing is persisted when a directory lookup fails. A failed append is
/// cut back out of file-backed stores, and a partial line left by a crash
/// is dropped before the next append.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    /// Manager directory backend failed
    #[error("directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// Record store failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
