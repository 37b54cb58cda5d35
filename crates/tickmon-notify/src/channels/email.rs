use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tickmon_common::types::Trigger;

use crate::{Delivery, DeliveryError, NotificationChannel};

/// Transactional email over the provider's HTTP API, one call per
/// recipient address. Without an API key configured, sends are skipped
/// with a logged notice rather than treated as failures.
pub struct EmailChannel {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    sender_name: String,
    sender_email: String,
}

impl EmailChannel {
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        sender_name: impl Into<String>,
        sender_email: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            sender_name: sender_name.into(),
            sender_email: sender_email.into(),
        }
    }

    pub(crate) fn payload(&self, to: &str, trigger: &Trigger) -> Value {
        serde_json::json!({
            "sender": { "name": self.sender_name, "email": self.sender_email },
            "to": [ { "email": to } ],
            "subject": format!("tickmon alert: {}", trigger.symbol),
            "textContent": trigger.rule.message,
        })
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    async fn send(&self, trigger: &Trigger, recipients: &[String]) -> Result<Delivery> {
        let Some(api_key) = &self.api_key else {
            tracing::info!(
                rule = %trigger.rule.id,
                "Email alert skipped, no provider API key configured"
            );
            return Ok(Delivery::default());
        };

        let mut outcome = Delivery::default();
        for to in recipients {
            let resp = self
                .client
                .post(&self.endpoint)
                .header("accept", "application/json")
                .header("api-key", api_key)
                .header("content-type", "application/json")
                .json(&self.payload(to, trigger))
                .send()
                .await;

            match resp {
                // the provider answers 201 Created for an accepted message
                Ok(resp) if resp.status() == reqwest::StatusCode::CREATED => {
                    tracing::info!(recipient = %to, rule = %trigger.rule.id, "Email sent");
                    outcome.delivered += 1;
                }
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    let err = DeliveryError {
                        recipient: to.clone(),
                        reason: format!("HTTP {status}: {body}"),
                    };
                    tracing::error!(error = %err, "Email delivery failed");
                    outcome.failed += 1;
                }
                Err(e) => {
                    let err = DeliveryError {
                        recipient: to.clone(),
                        reason: e.to_string(),
                    };
                    tracing::error!(error = %err, "Email delivery failed");
                    outcome.failed += 1;
                }
            }
        }

        Ok(outcome)
    }

    fn channel_name(&self) -> &str {
        "email"
    }
}
