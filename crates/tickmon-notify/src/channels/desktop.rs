use anyhow::Result;
use async_trait::async_trait;
use chrono::Local;
use tickmon_common::types::Trigger;

use crate::util::{truncate_body, MAX_BODY_LEN};
use crate::{Delivery, NotificationChannel};

/// Local desktop notification. Takes no recipients: the toast goes to
/// whatever desktop session the daemon runs in. A missing notification
/// backend is logged, never propagated.
pub struct DesktopChannel;

impl DesktopChannel {
    pub(crate) fn body(trigger: &Trigger) -> String {
        truncate_body(
            &format!("{} - {}", trigger.symbol, trigger.rule.message),
            MAX_BODY_LEN,
        )
    }
}

#[async_trait]
impl NotificationChannel for DesktopChannel {
    async fn send(&self, trigger: &Trigger, _recipients: &[String]) -> Result<Delivery> {
        let title = format!("tickmon alert {}", Local::now().format("%H:%M:%S"));
        let body = Self::body(trigger);

        // the notification backend call is a synchronous bus roundtrip
        let shown = tokio::task::spawn_blocking(move || {
            notify_rust::Notification::new()
                .summary(&title)
                .body(&body)
                .show()
        })
        .await?;

        match shown {
            Ok(_) => {
                tracing::info!(
                    symbol = %trigger.symbol,
                    rule = %trigger.rule.id,
                    "Desktop alert shown"
                );
                Ok(Delivery {
                    delivered: 1,
                    failed: 0,
                })
            }
            Err(e) => {
                tracing::error!(error = %e, "Desktop notification backend unavailable");
                Ok(Delivery {
                    delivered: 0,
                    failed: 1,
                })
            }
        }
    }

    fn channel_name(&self) -> &str {
        "desktop"
    }
}
