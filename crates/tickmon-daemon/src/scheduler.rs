//! The scan loop: load rules, fetch metrics, evaluate, persist, dispatch,
//! sleep.

use std::sync::Arc;

use tickmon_alert::engine::{self, EngineState};
use tickmon_notify::dispatcher::Notify;
use tickmon_store::RuleStore;
use tokio::signal;
use tokio::time::{interval, Duration};

use crate::provider::MetricsSource;

pub struct ScanScheduler {
    store: RuleStore,
    source: Arc<dyn MetricsSource>,
    notifier: Arc<dyn Notify>,
    interval_secs: u64,
    state: EngineState,
}

impl ScanScheduler {
    pub fn new(
        store: RuleStore,
        source: Arc<dyn MetricsSource>,
        notifier: Arc<dyn Notify>,
        interval_secs: u64,
    ) -> Self {
        Self {
            store,
            source,
            notifier,
            interval_secs,
            state: EngineState::new(),
        }
    }

    /// Runs until ctrl-c. Shutdown is only observed between passes, so an
    /// in-flight document save always completes before the loop exits.
    pub async fn run(&mut self) {
        tracing::info!(
            interval_secs = self.interval_secs,
            alerts = %self.store.path().display(),
            "Scan loop started"
        );

        let mut tick = interval(Duration::from_secs(self.interval_secs));
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    if let Err(e) = self.run_pass().await {
                        tracing::error!(error = %e, "Scan pass failed");
                    }
                }
                _ = signal::ctrl_c() => {
                    tracing::info!("Shutting down gracefully");
                    break;
                }
            }
        }
    }

    /// One full pass. The document is re-loaded fresh each time so edits
    /// made between passes are picked up; any error skips the rest of the
    /// pass and the loop stays on schedule.
    pub async fn run_pass(&mut self) -> anyhow::Result<()> {
        let mut doc = self.store.load()?;
        if doc.is_empty() {
            tracing::debug!("No alert rules configured");
            return Ok(());
        }

        let table = self.source.fetch().await?;
        let triggers = engine::run_pass(&mut doc, &table, &mut self.state);
        self.store.save(&doc)?;

        for trigger in &triggers {
            self.notifier.dispatch(trigger).await;
        }

        tracing::info!(
            rules = doc.rule_count(),
            triggered = triggers.len(),
            "Alerts checked"
        );
        Ok(())
    }
}
