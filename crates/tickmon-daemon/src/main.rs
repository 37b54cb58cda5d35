mod config;
mod provider;
mod scheduler;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use tickmon_notify::channels::email::EmailChannel;
use tickmon_notify::channels::webhook::WebhookChannel;
use tickmon_notify::dispatcher::{ChannelDefaults, Dispatcher};
use tickmon_store::RuleStore;

use crate::provider::HttpMetricsSource;
use crate::scheduler::ScanScheduler;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tickmon=info".parse()?))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/daemon.toml".to_string());
    let config = config::DaemonConfig::load(&config_path)?;

    tracing::info!(
        interval_secs = config.interval_secs,
        alerts = %config.alerts_path,
        source = %config.source.endpoint,
        "tickmon-daemon starting"
    );

    let client = tickmon_notify::http_client()?;

    let webhook = WebhookChannel::new(client.clone(), config.alerts.webhook_username.clone());
    let email = EmailChannel::new(
        client.clone(),
        config.email.endpoint.clone(),
        config.email.api_key.clone().filter(|k| !k.is_empty()),
        config.email.sender_name.clone(),
        config.email.sender_email.clone(),
    );
    let defaults = ChannelDefaults {
        webhook_urls: config.alerts.default_webhook.as_slice().to_vec(),
        email: config
            .alerts
            .default_email
            .clone()
            .filter(|e| !e.is_empty()),
    };
    let dispatcher = Arc::new(Dispatcher::new(webhook, email, defaults));

    let source = Arc::new(HttpMetricsSource::new(
        client,
        config.source.endpoint.clone(),
        config.source.watchlist_dir.clone().map(PathBuf::from),
    ));

    let store = RuleStore::new(&config.alerts_path);
    let mut scheduler = ScanScheduler::new(store, source, dispatcher, config.interval_secs);
    scheduler.run().await;

    tracing::info!("tickmon-daemon stopped");
    Ok(())
}
