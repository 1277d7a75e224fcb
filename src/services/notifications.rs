use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// Operator-facing summary of a transfer event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferNotification {
    pub business_id: Uuid,
    pub transfer_id: Uuid,
    pub action: String,
    pub message: String,
}

/// Outbound notification channel. Fire-and-forget: callers log failures and
/// move on; delivery never blocks or fails a transfer mutation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: TransferNotification) -> anyhow::Result<()>;
}

/// Default sink when no webhook is configured.
#[derive(Debug, Default)]
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn notify(&self, notification: TransferNotification) -> anyhow::Result<()> {
        info!(
            business_id = %notification.business_id,
            transfer_id = %notification.transfer_id,
            action = %notification.action,
            "notification: {}",
            notification.message
        );
        Ok(())
    }
}

/// Posts notifications to an external chat/webhook endpoint.
pub struct WebhookNotificationSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotificationSink {
    pub fn new(url: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl NotificationSink for WebhookNotificationSink {
    async fn notify(&self, notification: TransferNotification) -> anyhow::Result<()> {
        self.client
            .post(&self.url)
            .json(&notification)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
