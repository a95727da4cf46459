// src/poll/packs.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::oauth;
use super::{SourcePoller, DEFAULT_CALL_TIMEOUT};
use crate::diff::replace_and_diff;
use crate::store::DiffStore;
use crate::AssetSet;

pub const PACKS_CATALOG_URL: &str = "https://catalog-public-service-prod06.ol.epicgames.com/catalog/api/shared/namespace/fn/offers?lang=en&country=US&count=25";

#[derive(Debug, Clone)]
pub struct PacksCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Default, Deserialize)]
struct Catalog {
    #[serde(default)]
    elements: Vec<CatalogElement>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogElement {
    #[serde(rename = "keyImages", default)]
    key_images: Vec<KeyImage>,
}

#[derive(Debug, Default, Deserialize)]
struct KeyImage {
    #[serde(default)]
    url: Option<String>,
}

impl Catalog {
    /// `elements[].keyImages[].url` values with an http(s) scheme.
    fn key_image_urls(self) -> AssetSet {
        self.elements
            .into_iter()
            .flat_map(|el| el.key_images)
            .filter_map(|img| img.url)
            .filter(|url| url.starts_with("http://") || url.starts_with("https://"))
            .collect()
    }
}

/// Catalog offers poller. The stored URL set is always replaced by the latest
/// full catalog, even when nothing new showed up.
pub struct PacksPoller {
    client: Client,
    creds: PacksCredentials,
    token_url: String,
    catalog_url: String,
    timeout: Duration,
}

impl PacksPoller {
    pub fn new(client: Client, creds: PacksCredentials) -> Self {
        Self {
            client,
            creds,
            token_url: oauth::CLIENT_TOKEN_URL.to_string(),
            catalog_url: PACKS_CATALOG_URL.to_string(),
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_urls(mut self, token_url: impl Into<String>, catalog_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self.catalog_url = catalog_url.into();
        self
    }

    async fn fetch_catalog(&self) -> Result<Catalog> {
        let token = oauth::client_credentials_token(
            &self.client,
            &self.token_url,
            &self.creds.client_id,
            &self.creds.client_secret,
            self.timeout,
        )
        .await?;

        let resp = self
            .client
            .get(&self.catalog_url)
            .timeout(self.timeout)
            .bearer_auth(token)
            .send()
            .await
            .context("catalog: request")?
            .error_for_status()
            .context("catalog: non-2xx")?;
        resp.json::<Catalog>().await.context("catalog: parse body")
    }
}

#[async_trait]
impl SourcePoller for PacksPoller {
    async fn poll(&self, store: &mut DiffStore) -> Result<AssetSet> {
        let current = self.fetch_catalog().await?.key_image_urls();
        let added = replace_and_diff(&mut store.packs, current);

        if added.is_empty() {
            tracing::debug!("no new packs assets");
        } else {
            tracing::debug!(new = added.len(), "new packs assets detected");
        }
        Ok(added)
    }

    fn name(&self) -> &'static str {
        "packs"
    }
}
