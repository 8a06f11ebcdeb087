//! Alert notification dispatch
//!
//! Sends alert create/update notifications to configured channels (Slack
//! and generic webhooks). Dispatch runs as an async task behind a bounded
//! queue so a slow or failing channel never blocks ingestion.

use reqwest::Client;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::{AlertConfig, SlackConfig, WebhookConfig};
use crate::models::{AlertNotification, Severity};

/// Errors that can occur during notification dispatch
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Notification channel closed")]
    ChannelClosed,
}

/// Async notification dispatcher
///
/// Receives notifications from the queue and fans them out to every
/// configured channel. Spawn `run()` as a tokio task.
pub struct NotificationDispatcher {
    config: AlertConfig,
    client: Client,
}

impl NotificationDispatcher {
    pub fn new(config: AlertConfig) -> Self {
        NotificationDispatcher {
            config,
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Create the bounded queue connecting the pipeline to the dispatcher
    pub fn create_channel() -> (mpsc::Sender<AlertNotification>, mpsc::Receiver<AlertNotification>)
    {
        mpsc::channel(100)
    }

    /// Run the dispatch loop until the queue closes
    pub async fn run(self, mut rx: mpsc::Receiver<AlertNotification>) {
        log::info!("Notification dispatcher started");

        while let Some(notification) = rx.recv().await {
            if !self.config.enabled {
                continue;
            }

            if notification.severity < self.config.min_severity {
                log::debug!(
                    "Skipping notification for {} (severity {} < min {})",
                    notification.source,
                    notification.severity,
                    self.config.min_severity
                );
                continue;
            }

            log::info!(
                "Dispatching notification: {} (severity {})",
                notification.source,
                notification.severity
            );

            if let Err(e) = self.dispatch(&notification).await {
                log::error!("Failed to dispatch notification: {}", e);
            }
        }

        log::info!("Notification dispatcher stopped");
    }

    /// Send a notification to all configured channels
    async fn dispatch(&self, notification: &AlertNotification) -> Result<(), AlertError> {
        let mut errors = Vec::new();

        if let Some(ref slack) = self.config.slack {
            if let Err(e) = self.send_slack(slack, notification).await {
                log::error!("Slack notification failed: {}", e);
                errors.push(e);
            }
        }

        for webhook in &self.config.webhooks {
            if let Err(e) = self.send_generic_webhook(webhook, notification).await {
                log::error!("Webhook {} failed: {}", webhook.name, e);
                errors.push(e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.remove(0))
        }
    }

    async fn send_slack(
        &self,
        config: &SlackConfig,
        notification: &AlertNotification,
    ) -> Result<(), AlertError> {
        let severity_emoji = match notification.severity {
            Severity::Critical => ":rotating_light:",
            Severity::High => ":warning:",
            Severity::Medium => ":exclamation:",
            Severity::Low => ":information_source:",
        };

        let color = match notification.severity {
            Severity::Critical | Severity::High => "danger",
            Severity::Medium => "warning",
            Severity::Low => "good",
        };

        let title = if notification.created {
            format!("{} New brute-force alert", severity_emoji)
        } else {
            format!("{} Brute-force alert updated", severity_emoji)
        };

        let payload = serde_json::json!({
            "channel": config.channel,
            "username": config.username.as_deref().unwrap_or("Vigil"),
            "icon_emoji": ":shield:",
            "attachments": [{
                "color": color,
                "title": title,
                "fields": [
                    { "title": "Source", "value": &notification.source, "short": true },
                    { "title": "Severity", "value": notification.severity.as_str(), "short": true },
                    { "title": "Risk score", "value": notification.risk_score.to_string(), "short": true },
                ],
                "text": &notification.summary,
                "ts": notification.timestamp,
            }]
        });

        let response = self
            .client
            .post(&config.webhook_url)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            log::warn!("Slack returned non-success status: {}", response.status());
        }

        Ok(())
    }

    async fn send_generic_webhook(
        &self,
        config: &WebhookConfig,
        notification: &AlertNotification,
    ) -> Result<(), AlertError> {
        let method = config.method.as_deref().unwrap_or("POST");

        let mut request = match method.to_uppercase().as_str() {
            "PUT" => self.client.put(&config.url),
            _ => self.client.post(&config.url),
        };

        if let Some(ref headers) = config.headers {
            for (key, value) in headers {
                request = request.header(key, value);
            }
        }

        let response = request.json(notification).send().await?;

        if !response.status().is_success() {
            log::warn!(
                "Webhook {} returned non-success status: {}",
                config.name,
                response.status()
            );
        }

        Ok(())
    }
}

/// Sync-friendly handle for queueing notifications from the ingestion path
#[derive(Clone)]
pub struct AlertQueue {
    tx: mpsc::Sender<AlertNotification>,
}

impl AlertQueue {
    pub fn new(tx: mpsc::Sender<AlertNotification>) -> Self {
        AlertQueue { tx }
    }

    /// Queue a notification without blocking. A full queue drops the
    /// notification with a warning; ingestion always wins over delivery.
    pub fn queue_notification(&self, notification: AlertNotification) {
        if let Err(e) = self.tx.try_send(notification) {
            match e {
                mpsc::error::TrySendError::Full(_) => {
                    log::warn!("Notification queue full, dropping notification");
                }
                mpsc::error::TrySendError::Closed(_) => {
                    log::warn!("Notification queue closed");
                }
            }
        }
    }

    /// Queue a notification (async version)
    pub async fn queue_notification_async(
        &self,
        notification: AlertNotification,
    ) -> Result<(), AlertError> {
        self.tx
            .send(notification)
            .await
            .map_err(|_| AlertError::ChannelClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_notification() -> AlertNotification {
        AlertNotification {
            source: "45.33.22.11".to_string(),
            severity: Severity::Critical,
            risk_score: 100,
            summary: "Test summary".to_string(),
            created: true,
            timestamp: 1700000000,
        }
    }

    #[tokio::test]
    async fn test_queue_open() {
        let (tx, _rx) = NotificationDispatcher::create_channel();
        let queue = AlertQueue::new(tx);
        assert!(!queue.is_closed());
    }

    #[tokio::test]
    async fn test_queue_send() {
        let (tx, mut rx) = NotificationDispatcher::create_channel();
        let queue = AlertQueue::new(tx);

        queue.queue_notification(create_test_notification());

        let received = rx.recv().await;
        assert!(received.is_some());
        assert_eq!(received.unwrap().source, "45.33.22.11");
    }

    #[tokio::test]
    async fn test_queue_async_send() {
        let (tx, mut rx) = NotificationDispatcher::create_channel();
        let queue = AlertQueue::new(tx);

        queue
            .queue_notification_async(create_test_notification())
            .await
            .unwrap();

        let received = rx.recv().await;
        assert!(received.is_some());
    }

    #[test]
    fn test_severity_gating() {
        let config = AlertConfig {
            enabled: true,
            min_severity: Severity::High,
            slack: None,
            webhooks: vec![],
        };

        let mut notification = create_test_notification();
        notification.severity = Severity::Medium;
        assert!(notification.severity < config.min_severity);

        notification.severity = Severity::Critical;
        assert!(notification.severity >= config.min_severity);
    }
}
