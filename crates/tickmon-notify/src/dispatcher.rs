//! Channel selection and recipient resolution for triggered rules.

use async_trait::async_trait;
use tickmon_common::types::{Channel, Trigger};

use crate::channels::desktop::DesktopChannel;
use crate::channels::email::EmailChannel;
use crate::channels::webhook::WebhookChannel;
use crate::NotificationChannel;

/// Configured fallbacks used when a rule carries no recipients of its own.
#[derive(Debug, Clone, Default)]
pub struct ChannelDefaults {
    pub webhook_urls: Vec<String>,
    pub email: Option<String>,
}

/// Delivers triggers on the channel each rule asked for. The scan loop only
/// talks to this trait, which keeps dispatch swappable in tests.
#[async_trait]
pub trait Notify: Send + Sync {
    async fn dispatch(&self, trigger: &Trigger);
}

pub struct Dispatcher {
    desktop: DesktopChannel,
    webhook: WebhookChannel,
    email: EmailChannel,
    defaults: ChannelDefaults,
}

impl Dispatcher {
    pub fn new(webhook: WebhookChannel, email: EmailChannel, defaults: ChannelDefaults) -> Self {
        Self {
            desktop: DesktopChannel,
            webhook,
            email,
            defaults,
        }
    }

    /// A rule's own non-empty recipients win; otherwise the configured
    /// defaults for its channel. Desktop needs none.
    pub(crate) fn recipients_for(&self, trigger: &Trigger) -> Vec<String> {
        let own = trigger.rule.recipients.as_ref().filter(|r| !r.is_empty());
        match trigger.rule.channel {
            Channel::Desktop => Vec::new(),
            Channel::Webhook => own
                .map(|r| r.as_slice().to_vec())
                .unwrap_or_else(|| self.defaults.webhook_urls.clone()),
            Channel::Email => own
                .map(|r| r.as_slice().to_vec())
                .unwrap_or_else(|| self.defaults.email.iter().cloned().collect()),
        }
    }

    fn channel(&self, channel: Channel) -> &dyn NotificationChannel {
        match channel {
            Channel::Desktop => &self.desktop,
            Channel::Webhook => &self.webhook,
            Channel::Email => &self.email,
        }
    }
}

#[async_trait]
impl Notify for Dispatcher {
    async fn dispatch(&self, trigger: &Trigger) {
        let recipients = self.recipients_for(trigger);
        let channel = self.channel(trigger.rule.channel);

        match channel.send(trigger, &recipients).await {
            Ok(outcome) => {
                tracing::info!(
                    channel = channel.channel_name(),
                    rule = %trigger.rule.id,
                    symbol = %trigger.symbol,
                    delivered = outcome.delivered,
                    failed = outcome.failed,
                    "Dispatch finished"
                );
            }
            Err(e) => {
                tracing::error!(
                    channel = channel.channel_name(),
                    rule = %trigger.rule.id,
                    error = %e,
                    "Dispatch failed"
                );
            }
        }
    }
}
