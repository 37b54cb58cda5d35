//! Notification delivery for triggered alerts.
//!
//! Each channel (desktop, webhook, email) implements
//! [`NotificationChannel`]; the [`dispatcher::Dispatcher`] picks the
//! channel a rule asked for, resolves recipients against configured
//! defaults, and fans out. Delivery is fire-and-forget: one attempt per
//! recipient, failures are logged, and no failure blocks a sibling
//! recipient or rule.

pub mod channels;
pub mod dispatcher;

mod util;

#[cfg(test)]
mod tests;

use anyhow::Result;
use async_trait::async_trait;
use tickmon_common::types::Trigger;

/// Bounded per-request timeout so one unreachable recipient cannot stall a
/// whole scan pass.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Builds the HTTP client the network channels share.
pub fn http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
}

/// Per-recipient outcome counts for one dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: u32,
    pub failed: u32,
}

/// One recipient that could not be delivered to.
#[derive(Debug, thiserror::Error)]
#[error("delivery to {recipient} failed: {reason}")]
pub struct DeliveryError {
    pub recipient: String,
    pub reason: String,
}

/// A notification delivery channel.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Delivers `trigger` to each recipient independently. Per-recipient
    /// failures are logged and counted in the returned [`Delivery`]; the
    /// call itself only errors on conditions that make every recipient
    /// unreachable.
    async fn send(&self, trigger: &Trigger, recipients: &[String]) -> Result<Delivery>;

    /// Channel type name (`"desktop"`, `"webhook"`, `"email"`).
    fn channel_name(&self) -> &str;
}
