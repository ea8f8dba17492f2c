// libs/appointment-cell/src/services/notification.rs
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info, instrument};

use shared_config::AppConfig;
use shared_models::scheduling::Appointment;

/// Outbound message delivery. This core only decides when to send;
/// rendering and transport belong to the implementation.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()>;
}

/// Writes notifications to the log. Used when no webhook is configured.
#[derive(Debug, Default)]
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        info!(recipient = %recipient, subject = %subject, "NOTIFY: {}", body);
        Ok(())
    }
}

/// POSTs `{recipient, subject, body}` as JSON to a fixed URL.
pub struct WebhookDispatcher {
    client: Client,
    url: String,
}

impl WebhookDispatcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Option<Self> {
        config
            .is_webhook_configured()
            .then(|| Self::new(config.notification_webhook_url.clone()))
    }
}

#[async_trait]
impl NotificationDispatcher for WebhookDispatcher {
    #[instrument(skip(self, body))]
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        debug!("Posting notification to {}", self.url);

        let response = self
            .client
            .post(&self.url)
            .json(&json!({
                "recipient": recipient,
                "subject": subject,
                "body": body,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Notification webhook error ({}): {}", status, error_text));
        }

        Ok(())
    }
}

/// Where messages about an appointment go: the email when known, otherwise
/// whatever identity the client was booked under.
pub fn recipient_for(appointment: &Appointment) -> &str {
    appointment
        .client_email
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .unwrap_or(&appointment.client_identity)
}
