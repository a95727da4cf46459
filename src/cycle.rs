// src/cycle.rs
//! One polling cycle: run every source, merge what is new, persist, announce.

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;

use crate::notify::Notifier;
use crate::poll::{PollOutcome, SourcePoller};
use crate::store::DiffStore;
use crate::AssetSet;

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("poll_cycles_total", "Polling cycles started.");
        describe_counter!(
            "poll_source_errors_total",
            "Sources or endpoints that produced nothing because of an error."
        );
        describe_counter!("assets_detected_total", "New assets found across all sources.");
        describe_counter!("assets_delivered_total", "Asset cards delivered to the channel.");
        describe_counter!("asset_delivery_errors_total", "Asset cards that failed to deliver.");
    });
}

/// Summary of a finished cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub detected: AssetSet,
    pub outcomes: Vec<(&'static str, PollOutcome)>,
    pub delivered: usize,
    pub failed: usize,
}

pub struct UpdateOrchestrator {
    pollers: Vec<Box<dyn SourcePoller>>,
    store: DiffStore,
    notifier: Arc<dyn Notifier>,
    message_delay: Duration,
}

impl UpdateOrchestrator {
    /// Pollers run in the given order, one at a time.
    pub fn new(pollers: Vec<Box<dyn SourcePoller>>, store: DiffStore, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            pollers,
            store,
            notifier,
            message_delay: Duration::from_secs(1),
        }
    }

    /// Pause after each delivered asset.
    pub fn with_message_delay(mut self, delay: Duration) -> Self {
        self.message_delay = delay;
        self
    }

    pub fn store(&self) -> &DiffStore {
        &self.store
    }

    pub async fn run_cycle(&mut self) -> CycleReport {
        ensure_metrics_described();
        counter!("poll_cycles_total").increment(1);
        tracing::debug!("checking for updates");

        let mut report = CycleReport::default();
        for poller in &self.pollers {
            let outcome = PollOutcome::from(poller.poll(&mut self.store).await);
            match &outcome {
                PollOutcome::Assets(set) => report.detected.extend(set.iter().cloned()),
                PollOutcome::Failed { reason } => {
                    tracing::error!(source = poller.name(), error = %reason, "source failed");
                    counter!("poll_source_errors_total", "source" => poller.name()).increment(1);
                }
            }
            report.outcomes.push((poller.name(), outcome));
        }

        if let Err(e) = self.store.save_snapshots().await {
            tracing::warn!(error = ?e, "saving snapshots failed");
        }

        if report.detected.is_empty() {
            tracing::debug!("no new assets detected");
            return report;
        }

        counter!("assets_detected_total").increment(report.detected.len() as u64);
        tracing::info!(count = report.detected.len(), "new assets detected");

        for url in &report.detected {
            match self.notifier.send_asset(url).await {
                Ok(()) => {
                    report.delivered += 1;
                    counter!("assets_delivered_total").increment(1);
                }
                Err(e) => {
                    report.failed += 1;
                    counter!("asset_delivery_errors_total").increment(1);
                    tracing::error!(asset = %url, error = ?e, "sending asset failed");
                }
            }
            tokio::time::sleep(self.message_delay).await;
        }

        report
    }
}
