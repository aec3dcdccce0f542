use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use super::{format_message, Notifier};
use crate::error::DeliveryError;
use crate::extract::types::AdvertRecord;

/// Which chat service's incoming-webhook body to produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookFlavor {
    /// `{"text": "..."}`
    #[default]
    Slack,
    /// `{"content": "..."}`
    Discord,
}

impl WebhookFlavor {
    fn body(self, text: String) -> serde_json::Value {
        match self {
            WebhookFlavor::Slack => serde_json::json!({ "text": text }),
            WebhookFlavor::Discord => serde_json::json!({ "content": text }),
        }
    }
}

#[derive(Clone)]
pub struct WebhookNotifier {
    webhook_url: String,
    flavor: WebhookFlavor,
    client: Client,
    timeout: Duration,
}

impl WebhookNotifier {
    pub fn new(webhook_url: String) -> Self {
        Self {
            webhook_url,
            flavor: WebhookFlavor::default(),
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_flavor(mut self, flavor: WebhookFlavor) -> Self {
        self.flavor = flavor;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// One POST, no retries.
    pub async fn deliver(&self, text: String) -> Result<(), DeliveryError> {
        let rsp = self
            .client
            .post(&self.webhook_url)
            .timeout(self.timeout)
            .json(&self.flavor.body(text))
            .send()
            .await?;

        let status = rsp.status();
        tracing::debug!(status = %status, "webhook response");
        if !status.is_success() {
            return Err(DeliveryError::Status(status));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, record: &AdvertRecord) -> bool {
        match self.deliver(format_message(record)).await {
            Ok(()) => {
                tracing::info!(
                    portal = %record.source_id,
                    external_id = %record.external_id,
                    "notification sent"
                );
                true
            }
            Err(e) => {
                tracing::warn!(
                    portal = %record.source_id,
                    external_id = %record.external_id,
                    error = %e,
                    "notification not delivered"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flavors_use_their_text_field() {
        assert_eq!(
            WebhookFlavor::Slack.body("hi".into()),
            serde_json::json!({"text": "hi"})
        );
        assert_eq!(
            WebhookFlavor::Discord.body("hi".into()),
            serde_json::json!({"content": "hi"})
        );
    }

    #[test]
    fn flavor_parses_lowercase() {
        let f: WebhookFlavor = serde_json::from_str(r#""discord""#).unwrap();
        assert_eq!(f, WebhookFlavor::Discord);
    }

    #[tokio::test]
    async fn unreachable_webhook_reports_false() {
        let n = WebhookNotifier::new("http://127.0.0.1:9/hook".into())
            .with_timeout(Duration::from_secs(2));
        let rec = AdvertRecord {
            source_id: "x".into(),
            external_id: "1".into(),
            title: "Desk".into(),
            url: "https://x/1".into(),
            price: None,
        };
        assert!(!n.send(&rec).await);
    }
}
