// src/poll/content.rs
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use metrics::counter;
use reqwest::Client;

use super::http::{fetch_json_with_retry, RetryPolicy};
use super::SourcePoller;
use crate::diff::replace_and_diff;
use crate::extract::extract_image_urls;
use crate::store::DiffStore;
use crate::AssetSet;

/// Public content pages polled by default.
pub const DEFAULT_ENDPOINTS: [&str; 5] = [
    "https://fortnitecontent-website-prod07.ol.epicgames.com/content/api/pages/fortnite-game/mp-item-shop",
    "https://fortnitecontent-website-prod07.ol.epicgames.com/content/api/pages/fortnite-game/shopoffervisuals",
    "https://fortnitecontent-website-prod07.ol.epicgames.com/content/api/pages/fortnite-game/tournamentinformation",
    "https://fortnitecontent-website-prod07.ol.epicgames.com/content/api/pages/fortnite-game/dynamicbackgrounds",
    "https://fortnitecontent-website-prod07.ol.epicgames.com/content/api/pages/fortnite-game/crewscreendata",
];

/// Polls a fixed list of unauthenticated JSON endpoints, one after another, and
/// diffs each endpoint's images against its own snapshot.
pub struct ContentPoller {
    client: Client,
    endpoints: Vec<String>,
    retry: RetryPolicy,
    request_delay: Duration,
}

impl ContentPoller {
    pub fn new(client: Client, endpoints: Vec<String>) -> Self {
        Self {
            client,
            endpoints,
            retry: RetryPolicy::default(),
            request_delay: Duration::from_secs(1),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Pause after each successful endpoint.
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }
}

#[async_trait]
impl SourcePoller for ContentPoller {
    /// An endpoint that keeps failing is skipped; its snapshot stays as it was so
    /// the next cycle still diffs against the last good fetch. Snapshots of
    /// endpoints that are no longer configured are dropped.
    async fn poll(&self, store: &mut DiffStore) -> Result<AssetSet> {
        tracing::debug!(endpoints = self.endpoints.len(), "fetching content endpoints");
        let pruned = store.endpoints.retain_endpoints(&self.endpoints);
        if pruned > 0 {
            tracing::info!(pruned, "dropped snapshots of unconfigured endpoints");
        }
        let mut detected = AssetSet::new();

        for endpoint in &self.endpoints {
            let data = match fetch_json_with_retry(&self.client, endpoint, &self.retry).await {
                Ok(v) => v,
                Err(e) => {
                    let reason = format!("{e:#}");
                    tracing::error!(endpoint = %endpoint, error = %reason, "max retries reached, skipping");
                    counter!("poll_source_errors_total", "source" => "content").increment(1);
                    continue;
                }
            };

            let current = extract_image_urls(&data);
            let added = replace_and_diff(store.endpoints.slot(endpoint), current);
            tracing::debug!(endpoint = %endpoint, new = added.len(), "endpoint diffed");
            detected.extend(added);

            tokio::time::sleep(self.request_delay).await;
        }

        Ok(detected)
    }

    fn name(&self) -> &'static str {
        "content"
    }
}
