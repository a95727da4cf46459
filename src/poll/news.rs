// src/poll/news.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::oauth::{self, DeviceAuth};
use super::{SourcePoller, DEFAULT_CALL_TIMEOUT};
use crate::diff::diff_news_items;
use crate::store::DiffStore;
use crate::AssetSet;

pub const NEWS_FEED_URL: &str =
    "https://prm-dialogue-public-api-prod.edea.live.use1a.on.epicgames.com/api/v1/fortnite-br/channel/motd/target";

/// Filter body sent with the feed request.
#[derive(Debug, Clone, Serialize)]
pub struct NewsFeedParams {
    pub parameters: FeedParameters,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedParameters {
    pub platform: String,
    pub language: String,
    pub server_region: String,
    pub country: String,
}

impl Default for NewsFeedParams {
    fn default() -> Self {
        Self {
            parameters: FeedParameters {
                platform: "Windows".into(),
                language: "en".into(),
                server_region: "EU".into(),
                country: "DE".into(),
            },
            tags: vec!["Product.BR".into()],
        }
    }
}

#[derive(Debug, Deserialize)]
struct FeedResponse {
    #[serde(rename = "contentItems")]
    content_items: Option<Vec<Value>>,
}

/// News feed poller. Items are identified by their content hash rather than by
/// URL; the known-hash set mirrors the latest feed exactly.
pub struct NewsPoller {
    client: Client,
    auth: DeviceAuth,
    token_url: String,
    feed_url: String,
    params: NewsFeedParams,
    request_delay: Duration,
    timeout: Duration,
}

impl NewsPoller {
    pub fn new(client: Client, auth: DeviceAuth) -> Self {
        Self {
            client,
            auth,
            token_url: oauth::DEVICE_TOKEN_URL.to_string(),
            feed_url: NEWS_FEED_URL.to_string(),
            params: NewsFeedParams::default(),
            request_delay: Duration::from_secs(1),
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_urls(mut self, token_url: impl Into<String>, feed_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self.feed_url = feed_url.into();
        self
    }

    pub fn with_params(mut self, params: NewsFeedParams) -> Self {
        self.params = params;
        self
    }

    /// Pause between the two token calls and before the feed call.
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    async fn access_token(&self) -> Result<String> {
        let refresh = oauth::device_auth_refresh_token(&self.client, &self.token_url, &self.auth, self.timeout)
            .await?;
        tokio::time::sleep(self.request_delay).await;
        let access =
            oauth::refresh_access_token(&self.client, &self.token_url, &self.auth, &refresh, self.timeout)
                .await?;
        tokio::time::sleep(self.request_delay).await;
        Ok(access)
    }

    async fn fetch_feed(&self, token: &str) -> Result<FeedResponse> {
        let resp = self
            .client
            .post(&self.feed_url)
            .timeout(self.timeout)
            .bearer_auth(token)
            .json(&self.params)
            .send()
            .await
            .context("news feed: request")?
            .error_for_status()
            .context("news feed: non-2xx")?;
        resp.json::<FeedResponse>()
            .await
            .context("news feed: parse body")
    }
}

#[async_trait]
impl SourcePoller for NewsPoller {
    async fn poll(&self, store: &mut DiffStore) -> Result<AssetSet> {
        let token = self.access_token().await?;
        let feed = self.fetch_feed(&token).await?;

        let added = match feed.content_items {
            Some(items) => {
                tracing::debug!(items = items.len(), "news feed fetched");
                diff_news_items(&mut store.news_hashes, &items)
            }
            None => {
                tracing::warn!("news feed has no contentItems, keeping known hashes");
                AssetSet::new()
            }
        };

        if let Err(e) = store.save_news().await {
            tracing::warn!(error = ?e, "saving news hashes failed");
        }

        if added.is_empty() {
            tracing::debug!("no new news assets");
        } else {
            tracing::debug!(new = added.len(), "new news assets detected");
        }
        Ok(added)
    }

    fn name(&self) -> &'static str {
        "news"
    }
}
