//! Admission intake configuration
//!
//! TOML file, every field defaulted. Relative paths in a loaded file are
//! resolved against the file's directory.

use crate::directory::{ManagerDirectory, SheetDirectory, StaticDirectory, TableDirectory};
use crate::error::{ConfigError, SetupError};
use crate::id::SequencePolicy;
use crate::notifier::{LogNotifier, Notifier, OutboxNotifier, WebhookNotifier};
use crate::store::{CsvRecordStore, JsonlRecordStore, RecordStore};
use crate::types::ManagerProfile;
use crate::workflow::AdmissionWorkflow;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default operational mailbox
pub const DEFAULT_RECIPIENT: &str = "admissao@example.com";

/// Default record store file
pub const DEFAULT_STORE_PATH: &str = "solicitacoes_admissao.csv";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Mailbox that receives every notification
    pub recipient: String,
    /// Attach the record store snapshot to notifications
    pub attach_snapshot: bool,
    /// Protocol sequence derivation
    pub sequence_policy: SequencePolicy,
    /// Record store settings
    pub store: StoreConfig,
    /// Manager directory backend
    pub directory: DirectoryConfig,
    /// Notification delivery backend
    pub notifier: NotifierConfig,
    /// Allow-list for the static directory
    pub managers: Vec<ManagerProfile>,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            recipient: DEFAULT_RECIPIENT.to_string(),
            attach_snapshot: true,
            sequence_policy: SequencePolicy::default(),
            store: StoreConfig::default(),
            directory: DirectoryConfig::default(),
            notifier: NotifierConfig::default(),
            managers: Vec::new(),
        }
    }
}

/// Record store settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backing file
    pub path: PathBuf,
    /// File layout; inferred from the extension when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<StoreFormat>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STORE_PATH),
            format: None,
        }
    }
}

impl StoreConfig {
    /// Configured format, or the one implied by the file extension
    ///
    /// `.jsonl` and `.ndjson` select JSON Lines; anything else is CSV.
    #[must_use]
    pub fn resolved_format(&self) -> StoreFormat {
        self.format.unwrap_or_else(|| {
            match self.path.extension().and_then(|e| e.to_str()) {
                Some(ext) if ext.eq_ignore_ascii_case("jsonl") || ext.eq_ignore_ascii_case("ndjson") => {
                    StoreFormat::Jsonl
                }
                _ => StoreFormat::Csv,
            }
        })
    }
}

/// Record store file layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreFormat {
    /// Header row plus one CSV row per request
    #[default]
    Csv,
    /// One JSON object per line
    Jsonl,
}

/// Manager directory backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DirectoryConfig {
    /// `[[managers]]` entries of this file
    #[default]
    Static,
    /// Local JSON/YAML table
    Table { path: PathBuf },
    /// Remote spreadsheet values range
    Sheet {
        url: String,
        #[serde(default = "default_cache_ttl_secs")]
        cache_ttl_secs: u64,
    },
}

fn default_cache_ttl_secs() -> u64 {
    SheetDirectory::DEFAULT_TTL.as_secs()
}

/// Notification delivery backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NotifierConfig {
    /// Pickup directory
    Outbox { dir: PathBuf },
    /// HTTP relay
    Webhook {
        url: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    /// Tracing output only
    Log,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self::Outbox {
            dir: PathBuf::from("outbox"),
        }
    }
}

fn default_timeout_secs() -> u64 {
    WebhookNotifier::DEFAULT_TIMEOUT.as_secs()
}

impl AdmissionConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With recipient
    #[inline]
    #[must_use]
    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = recipient.into();
        self
    }

    /// With record store path
    #[inline]
    #[must_use]
    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store.path = path.into();
        self
    }

    /// With directory backend
    #[inline]
    #[must_use]
    pub fn with_directory(mut self, directory: DirectoryConfig) -> Self {
        self.directory = directory;
        self
    }

    /// With notifier backend
    #[inline]
    #[must_use]
    pub fn with_notifier(mut self, notifier: NotifierConfig) -> Self {
        self.notifier = notifier;
        self
    }

    /// With sequence policy
    #[inline]
    #[must_use]
    pub fn with_sequence_policy(mut self, policy: SequencePolicy) -> Self {
        self.sequence_policy = policy;
        self
    }

    /// With snapshot attachment flag
    #[inline]
    #[must_use]
    pub fn with_attach_snapshot(mut self, attach: bool) -> Self {
        self.attach_snapshot = attach;
        self
    }

    /// With static allow-list entry
    #[must_use]
    pub fn with_manager(mut self, profile: ManagerProfile) -> Self {
        self.managers.push(profile);
        self
    }

    /// Parse from TOML text without path resolution
    ///
    /// # Errors
    /// Returns error if the text is not valid TOML for the schema or the
    /// result fails validation
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, resolving relative paths against its directory
    ///
    /// # Errors
    /// Returns error if the file is unreadable or invalid
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Make relative paths relative to `base`
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.store.path);
        if let DirectoryConfig::Table { path } = &mut self.directory {
            resolve(path);
        }
        if let NotifierConfig::Outbox { dir } = &mut self.notifier {
            resolve(dir);
        }
    }

    /// Check cross-field consistency
    ///
    /// # Errors
    /// Returns error describing the first inconsistency found
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.recipient.contains('@') {
            return Err(ConfigError::Invalid(format!(
                "recipient is not an e-mail address: '{}'",
                self.recipient
            )));
        }
        if self.store.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("store.path is empty".into()));
        }
        match &self.directory {
            DirectoryConfig::Sheet { url, .. } if url.trim().is_empty() => {
                return Err(ConfigError::Invalid("directory.url is required for kind = \"sheet\"".into()));
            }
            DirectoryConfig::Table { path } if path.as_os_str().is_empty() => {
                return Err(ConfigError::Invalid("directory.path is required for kind = \"table\"".into()));
            }
            _ => {}
        }
        if let NotifierConfig::Webhook { url, .. } = &self.notifier {
            if url.trim().is_empty() {
                return Err(ConfigError::Invalid("notifier.url is required for kind = \"webhook\"".into()));
            }
        }
        Ok(())
    }

    /// Open the configured manager directory
    ///
    /// # Errors
    /// Returns error if the backend cannot be loaded
    pub async fn open_directory(&self) -> Result<Arc<dyn ManagerDirectory>, SetupError> {
        let directory: Arc<dyn ManagerDirectory> = match &self.directory {
            DirectoryConfig::Static => {
                Arc::new(StaticDirectory::from_profiles(self.managers.iter().cloned())?)
            }
            DirectoryConfig::Table { path } => Arc::new(TableDirectory::open(path).await?),
            DirectoryConfig::Sheet {
                url,
                cache_ttl_secs,
            } => Arc::new(SheetDirectory::new(
                url.clone(),
                Duration::from_secs(*cache_ttl_secs),
            )),
        };
        Ok(directory)
    }

    /// Open the configured record store
    ///
    /// # Errors
    /// Returns error if the store file cannot be opened
    pub async fn open_store(&self) -> Result<Arc<dyn RecordStore>, SetupError> {
        let path = &self.store.path;
        let store: Arc<dyn RecordStore> = match self.store.resolved_format() {
            StoreFormat::Csv => Arc::new(CsvRecordStore::open(path).await?),
            StoreFormat::Jsonl => Arc::new(JsonlRecordStore::open(path).await?),
        };
        Ok(store)
    }

    /// Build the configured notifier
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn build_notifier(&self) -> Result<Arc<dyn Notifier>, SetupError> {
        let notifier: Arc<dyn Notifier> = match &self.notifier {
            NotifierConfig::Outbox { dir } => Arc::new(OutboxNotifier::new(dir.clone())),
            NotifierConfig::Webhook { url, timeout_secs } => Arc::new(WebhookNotifier::new(
                url.clone(),
                Duration::from_secs(*timeout_secs),
            )?),
            NotifierConfig::Log => Arc::new(LogNotifier),
        };
        Ok(notifier)
    }

    /// Assemble the full workflow
    ///
    /// # Errors
    /// Returns error if any component fails to open
    pub async fn build_workflow(&self) -> Result<AdmissionWorkflow, SetupError> {
        self.validate()?;
        let directory = self.open_directory().await?;
        let store = self.open_store().await?;
        let notifier = self.build_notifier()?;
        Ok(
            AdmissionWorkflow::new(directory, store, notifier, self.recipient.clone())
                .with_sequence_policy(self.sequence_policy)
                .with_attach_snapshot(self.attach_snapshot),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_is_default() {
        let config = AdmissionConfig::from_toml_str("").unwrap();
        assert_eq!(config, AdmissionConfig::default());
        assert_eq!(config.directory, DirectoryConfig::Static);
        assert!(config.attach_snapshot);
    }

    #[test]
    fn full_file_parses() {
        let config = AdmissionConfig::from_toml_str(
            r#"
recipient = "rh@empresa.com.br"
attach_snapshot = false
sequence_policy = "year-max"

[store]
path = "data/solicitacoes.txt"
format = "jsonl"

[directory]
kind = "sheet"
url = "https://sheets.example.com/values/gestores"

[notifier]
kind = "webhook"
url = "https://relay.example.com/send"
timeout_secs = 3

[[managers]]
email = "ana@example.com"
display_name = "Ana"
employer_name = "ACME"
employer_tax_id = "11.111.111/0001-11"
"#,
        )
        .unwrap();

        assert_eq!(config.recipient, "rh@empresa.com.br");
        assert_eq!(config.sequence_policy, SequencePolicy::YearMax);
        assert_eq!(config.store.resolved_format(), StoreFormat::Jsonl);
        assert_eq!(
            config.directory,
            DirectoryConfig::Sheet {
                url: "https://sheets.example.com/values/gestores".into(),
                cache_ttl_secs: 300,
            }
        );
        assert_eq!(
            config.notifier,
            NotifierConfig::Webhook {
                url: "https://relay.example.com/send".into(),
                timeout_secs: 3,
            }
        );
        assert_eq!(config.managers.len(), 1);
        assert!(config.managers[0].active);
    }

    #[test]
    fn store_format_follows_extension() {
        let format = |path: &str| {
            AdmissionConfig::new()
                .with_store_path(path)
                .store
                .resolved_format()
        };
        assert_eq!(AdmissionConfig::default().store.resolved_format(), StoreFormat::Csv);
        assert_eq!(format("r.csv"), StoreFormat::Csv);
        assert_eq!(format("r.JSONL"), StoreFormat::Jsonl);
        assert_eq!(format("r.ndjson"), StoreFormat::Jsonl);
        assert_eq!(format("registros"), StoreFormat::Csv);
    }

    #[tokio::test]
    async fn open_store_writes_configured_layout() {
        let dir = tempfile::tempdir().unwrap();
        let csv = AdmissionConfig::new().with_store_path(dir.path().join("r.csv"));
        let jsonl = AdmissionConfig::new().with_store_path(dir.path().join("r.jsonl"));

        assert_eq!(csv.open_store().await.unwrap().len().await.unwrap(), 0);
        assert_eq!(jsonl.open_store().await.unwrap().len().await.unwrap(), 0);
        assert!(dir.path().join("r.csv").exists());
        assert!(dir.path().join("r.jsonl").exists());
    }

    #[test]
    fn invalid_recipient_is_rejected() {
        let err = AdmissionConfig::from_toml_str("recipient = \"rh\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn sheet_without_url_is_rejected() {
        let err = AdmissionConfig::from_toml_str("[directory]\nkind = \"sheet\"\nurl = \"\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref m) if m.contains("directory.url")));
    }

    #[test]
    fn unknown_kind_is_parse_error() {
        let err = AdmissionConfig::from_toml_str("[notifier]\nkind = \"smtp\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("admission.toml");
        std::fs::write(
            &path,
            "[directory]\nkind = \"table\"\npath = \"gestores.yaml\"\n[notifier]\nkind = \"outbox\"\ndir = \"/var/spool/admission\"\n",
        )
        .unwrap();

        let config = AdmissionConfig::load(&path).unwrap();
        assert_eq!(config.store.path, dir.path().join(DEFAULT_STORE_PATH));
        assert_eq!(
            config.directory,
            DirectoryConfig::Table {
                path: dir.path().join("gestores.yaml")
            }
        );
        assert_eq!(
            config.notifier,
            NotifierConfig::Outbox {
                dir: PathBuf::from("/var/spool/admission")
            }
        );
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = AdmissionConfig::load("/nonexistent/admission.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[tokio::test]
    async fn builds_workflow_from_static_allow_list() {
        let dir = tempfile::tempdir().unwrap();
        let config = AdmissionConfig::new()
            .with_recipient("rh@example.com")
            .with_store_path(dir.path().join("r.csv"))
            .with_notifier(NotifierConfig::Log)
            .with_manager(ManagerProfile::new("ana@example.com", "Ana", "ACME", "1"));

        let workflow = config.build_workflow().await.unwrap();
        assert_eq!(workflow.recipient(), "rh@example.com");
        assert!(workflow
            .resolver()
            .resolve("ANA@example.com")
            .await
            .unwrap()
            .is_authorized());
    }

    #[tokio::test]
    async fn duplicate_allow_list_fails_setup() {
        let config = AdmissionConfig::new()
            .with_manager(ManagerProfile::new("ana@example.com", "Ana", "ACME", "1"))
            .with_manager(ManagerProfile::new("Ana@Example.com", "Ana", "ACME", "1"));
        let err = config.open_directory().await.unwrap_err();
        assert!(matches!(err, SetupError::Directory(_)));
    }
}
