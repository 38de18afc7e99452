//! # Notification Channels
//!
//! Polymorphic delivery of threshold-crossing error events. A channel has a
//! single capability, `deliver`; failures are surfaced to the monitor, which
//! logs them and moves on. Delivery must never disturb the reporting caller.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::ErrorEvent;

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Failed to reach notification endpoint: {0}")]
    Connection(String),

    #[error("Notification endpoint returned HTTP {0}")]
    Status(u16),

    #[error("Failed to encode notification payload: {0}")]
    Serialization(String),
}

/// One delivery capability. Implementations must be safe to call
/// concurrently and must not panic.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Short channel name used in monitor diagnostics.
    fn name(&self) -> &str;

    /// Deliver one error event to the channel's destination.
    async fn deliver(&self, event: &ErrorEvent) -> Result<(), ChannelError>;
}

/// Channel that emits a structured log line. Always available, used as the
/// baseline channel in every deployment.
#[derive(Debug, Default)]
pub struct LogChannel;

#[async_trait]
impl NotificationChannel for LogChannel {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, event: &ErrorEvent) -> Result<(), ChannelError> {
        tracing::error!(
            alert = true,
            error_type = %event.error_type,
            severity = %event.severity,
            count = event.count,
            "Alert: {}",
            event.message
        );
        Ok(())
    }
}

/// Channel that POSTs the event to a fixed operator webhook.
pub struct WebhookChannel {
    endpoint: String,
    auth_token: Option<String>,
    client: reqwest::Client,
}

impl WebhookChannel {
    pub fn new(endpoint: String, auth_token: Option<String>) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ChannelError::Connection(e.to_string()))?;

        Ok(Self {
            endpoint,
            auth_token,
            client,
        })
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn deliver(&self, event: &ErrorEvent) -> Result<(), ChannelError> {
        let payload = serde_json::json!({
            "error_type": event.error_type,
            "severity": event.severity.to_string(),
            "message": event.message,
            "context": event.context,
            "count": event.count,
            "occurred_at": event.occurred_at.to_rfc3339(),
        });

        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .header("Content-Type", "application/json");

        if let Some(token) = &self.auth_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ChannelError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ChannelError::Status(response.status().as_u16()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;

    #[tokio::test]
    async fn test_log_channel_never_fails() {
        let channel = LogChannel;
        let event = ErrorEvent::new("test_event", "message", Severity::Low);
        assert!(channel.deliver(&event).await.is_ok());
    }

    #[tokio::test]
    async fn test_webhook_channel_reports_connection_failure() {
        // Port 1 is never listening locally.
        let channel = WebhookChannel::new("http://127.0.0.1:1/alerts".to_string(), None).unwrap();
        let event = ErrorEvent::new("test_event", "message", Severity::High);

        match channel.deliver(&event).await {
            Err(ChannelError::Connection(_)) => {}
            other => panic!("expected connection error, got {:?}", other),
        }
    }
}
