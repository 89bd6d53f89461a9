//! Pickup-directory notifier
//!
//! Each notification becomes `<protocol_id>.json` in the outbox. A relay
//! process sends and removes the files. Existing files are never
//! overwritten: a repeated protocol ID gets a numeric suffix.

use super::{Notification, Notifier};
use crate::error::NotificationError;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// Upper bound on suffixed names tried for one protocol ID
const MAX_SUFFIX: u32 = 1000;

/// Writes notifications into a pickup directory
#[derive(Debug, Clone)]
pub struct OutboxNotifier {
    dir: PathBuf,
}

impl OutboxNotifier {
    /// Create notifier for a directory; it is created on first use
    #[inline]
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Outbox directory
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn candidate(&self, stem: &str, attempt: u32) -> PathBuf {
        if attempt == 0 {
            self.dir.join(format!("{stem}.json"))
        } else {
            self.dir.join(format!("{stem}-{attempt}.json"))
        }
    }
}

#[async_trait]
impl Notifier for OutboxNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotificationError> {
        let body = serde_json::to_vec_pretty(notification)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| NotificationError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let stem = notification.protocol_id.to_string();
        for attempt in 0..MAX_SUFFIX {
            let path = self.candidate(&stem, attempt);
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(source) => return Err(NotificationError::Io { path, source }),
            };
            file.write_all(&body)
                .await
                .map_err(|source| NotificationError::Io {
                    path: path.clone(),
                    source,
                })?;
            file.sync_data()
                .await
                .map_err(|source| NotificationError::Io {
                    path: path.clone(),
                    source,
                })?;
            tracing::info!(path = %path.display(), "notification queued in outbox");
            return Ok(());
        }
        Err(NotificationError::Transport(format!(
            "outbox has no free name for {stem}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProtocolId;

    fn notification(seq: u32) -> Notification {
        Notification {
            protocol_id: ProtocolId::new(2025, seq),
            to: "rh@example.com".into(),
            subject: "Nova solicitação".into(),
            text_body: "texto".into(),
            html_body: "<p>texto</p>".into(),
            attachment: None,
        }
    }

    #[tokio::test]
    async fn writes_message_named_after_protocol() {
        let dir = tempfile::tempdir().unwrap();
        let outbox = OutboxNotifier::new(dir.path().join("outbox"));
        outbox.notify(&notification(3)).await.unwrap();

        let path = dir.path().join("outbox/ADM-2025-00003.json");
        let stored: Notification =
            serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(stored, notification(3));
    }

    #[tokio::test]
    async fn repeated_protocol_gets_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let outbox = OutboxNotifier::new(dir.path());
        outbox.notify(&notification(3)).await.unwrap();
        outbox.notify(&notification(3)).await.unwrap();

        assert!(dir.path().join("ADM-2025-00003.json").exists());
        assert!(dir.path().join("ADM-2025-00003-1.json").exists());
    }

    #[tokio::test]
    async fn unusable_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let outbox = OutboxNotifier::new(blocker.join("outbox"));
        let err = outbox.notify(&notification(1)).await.unwrap_err();
        assert!(matches!(err, NotificationError::Io { .. }));
    }
}
