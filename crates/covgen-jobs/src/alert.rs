//! Operator alerting.
//!
//! Alerts are fire-and-forget: a failed alert is logged and swallowed,
//! never propagated to the job that raised it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

/// Fire-and-forget alert channel.
#[async_trait]
pub trait Alerter: Send + Sync {
    /// Send a plain-text alert.
    async fn notify(&self, text: &str);
}

/// Slack incoming-webhook alerter.
#[derive(Debug, Clone)]
pub struct SlackAlerter {
    client: Client,
    webhook_url: String,
}

impl SlackAlerter {
    /// Create a new alerter for an incoming-webhook URL.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn new(webhook_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait]
impl Alerter for SlackAlerter {
    async fn notify(&self, text: &str) {
        let body = serde_json::json!({ "text": text });

        match self.client.post(&self.webhook_url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                tracing::warn!(status = %response.status(), "Slack alert rejected");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Slack alert failed");
            }
        }
    }
}

/// Alerter used when no webhook is configured; logs instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAlerter;

#[async_trait]
impl Alerter for NoopAlerter {
    async fn notify(&self, text: &str) {
        tracing::warn!(alert = %text, "Alert channel not configured");
    }
}
