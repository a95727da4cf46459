// src/poll/mod.rs
pub mod content;
pub mod http;
pub mod news;
pub mod oauth;
pub mod packs;

use std::time::Duration;

use anyhow::Result;

use crate::store::DiffStore;
use crate::AssetSet;

pub use content::ContentPoller;
pub use news::{NewsFeedParams, NewsPoller};
pub use oauth::DeviceAuth;
pub use packs::{PacksCredentials, PacksPoller};

const USER_AGENT: &str = concat!("asset-watcher/", env!("CARGO_PKG_VERSION"));

/// Timeout for calls that don't carry their own (OAuth, news, packs).
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(20);

/// One upstream source family. Implementations read and update their slice of
/// the store and return the assets that are new since the last successful fetch.
#[async_trait::async_trait]
pub trait SourcePoller: Send + Sync {
    async fn poll(&self, store: &mut DiffStore) -> Result<AssetSet>;
    fn name(&self) -> &'static str;
}

/// What one poller contributed to a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Assets(AssetSet),
    Failed { reason: String },
}

impl From<Result<AssetSet>> for PollOutcome {
    fn from(res: Result<AssetSet>) -> Self {
        match res {
            Ok(set) => PollOutcome::Assets(set),
            Err(e) => PollOutcome::Failed {
                reason: format!("{e:#}"),
            },
        }
    }
}

/// Shared HTTP client for all pollers. Individual requests set their own timeout.
pub fn build_http_client() -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(5))
        .timeout(DEFAULT_CALL_TIMEOUT)
        .build()?;
    Ok(client)
}
