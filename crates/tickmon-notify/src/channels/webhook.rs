use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tickmon_common::types::Trigger;

use crate::{Delivery, DeliveryError, NotificationChannel};

/// JSON webhook POSTs, one per recipient URL. Any 2xx response counts as
/// delivered (Discord-style endpoints answer 204 No Content); everything
/// else is logged against that URL alone and the remaining URLs are still
/// attempted.
pub struct WebhookChannel {
    client: reqwest::Client,
    default_username: String,
}

impl WebhookChannel {
    pub fn new(client: reqwest::Client, default_username: impl Into<String>) -> Self {
        Self {
            client,
            default_username: default_username.into(),
        }
    }

    pub(crate) fn payload(&self, trigger: &Trigger) -> Value {
        serde_json::json!({
            "content": trigger.rule.message,
            "username": trigger
                .rule
                .username
                .as_deref()
                .unwrap_or(&self.default_username),
        })
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    async fn send(&self, trigger: &Trigger, recipients: &[String]) -> Result<Delivery> {
        let payload = self.payload(trigger);
        let mut outcome = Delivery::default();

        for url in recipients {
            match self.client.post(url).json(&payload).send().await {
                Ok(resp) if resp.status().is_success() => {
                    tracing::info!(url = %url, rule = %trigger.rule.id, "Webhook delivered");
                    outcome.delivered += 1;
                }
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    let err = DeliveryError {
                        recipient: url.clone(),
                        reason: format!("HTTP {status}: {body}"),
                    };
                    tracing::error!(error = %err, "Webhook delivery failed");
                    outcome.failed += 1;
                }
                Err(e) => {
                    let err = DeliveryError {
                        recipient: url.clone(),
                        reason: e.to_string(),
                    };
                    tracing::error!(error = %err, "Webhook delivery failed");
                    outcome.failed += 1;
                }
            }
        }

        Ok(outcome)
    }

    fn channel_name(&self) -> &str {
        "webhook"
    }
}
