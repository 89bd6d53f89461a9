//! HTTP relay notifier
//!
//! POSTs the rendered notification as JSON to a mail relay. Any non-2xx
//! answer counts as a failed delivery. No retries.

use super::{Notification, Notifier};
use crate::error::NotificationError;
use async_trait::async_trait;
use std::time::Duration;

/// Posts notifications to a relay endpoint
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    url: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// Default request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create notifier for a relay URL
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotificationError::Transport(e.to_string()))?;
        Ok(Self::with_client(url, client))
    }

    /// Create notifier with a preconfigured HTTP client
    #[must_use]
    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    /// Relay URL
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
            });
        }
        tracing::info!(
            protocol_id = %notification.protocol_id,
            status = status.as_u16(),
            "notification accepted by relay"
        );
        Ok(())
    }
}
