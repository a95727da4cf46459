// src/store/mod.rs
//! Durable "previous vs current" state.
//!
//! Three independent JSON files, each recoverable on its own:
//!
//! ```text
//! {state_dir}/
//! ├── previous_assets.json       # endpoint -> [asset url]
//! ├── previous_news_hashes.json  # [content hash]
//! └── packs.json                 # [asset url]
//! ```
//!
//! A missing or unreadable file loads as empty state. There is no transaction
//! across files; a crash between saves only means one source starts fresh.

mod json_file;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize};

use crate::AssetSet;

pub use json_file::JsonFile;

pub const ENDPOINTS_FILE: &str = "previous_assets.json";
pub const NEWS_HASHES_FILE: &str = "previous_news_hashes.json";
pub const PACKS_FILE: &str = "packs.json";

/// Last-seen asset set per generic content endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EndpointSnapshot(pub BTreeMap<String, AssetSet>);

impl EndpointSnapshot {
    pub fn get(&self, endpoint: &str) -> Option<&AssetSet> {
        self.0.get(endpoint)
    }

    /// Entry for `endpoint`, created empty on first use.
    pub fn slot(&mut self, endpoint: &str) -> &mut AssetSet {
        self.0.entry(endpoint.to_string()).or_default()
    }

    /// Drop entries for endpoints not in `configured`. Returns how many were removed.
    pub fn retain_endpoints(&mut self, configured: &[String]) -> usize {
        let before = self.0.len();
        self.0.retain(|endpoint, _| configured.iter().any(|c| c == endpoint));
        before - self.0.len()
    }
}

// Older state files stored each endpoint as `{url: "unknown"}`; accept both shapes.
#[derive(Deserialize)]
#[serde(untagged)]
enum UrlListRepr {
    List(Vec<String>),
    Keyed(BTreeMap<String, serde_json::Value>),
}

impl<'de> Deserialize<'de> for EndpointSnapshot {
    fn deserialize<D: Deserializer<'de>>(de: D) -> std::result::Result<Self, D::Error> {
        let raw: BTreeMap<String, UrlListRepr> = BTreeMap::deserialize(de)?;
        let map = raw
            .into_iter()
            .map(|(endpoint, urls)| {
                let set: AssetSet = match urls {
                    UrlListRepr::List(v) => v.into_iter().collect(),
                    UrlListRepr::Keyed(m) => m.into_keys().collect(),
                };
                (endpoint, set)
            })
            .collect();
        Ok(Self(map))
    }
}

/// Content hashes of news items that are currently known.
pub type NewsHashSet = BTreeSet<String>;

/// Full asset set of the packs catalog as of the last successful fetch.
pub type PacksSnapshot = AssetSet;

/// In-memory state plus the files backing it. Owned by the orchestrator and
/// handed to pollers by `&mut`.
#[derive(Debug)]
pub struct DiffStore {
    pub endpoints: EndpointSnapshot,
    pub news_hashes: NewsHashSet,
    pub packs: PacksSnapshot,
    endpoints_file: JsonFile<EndpointSnapshot>,
    news_file: JsonFile<NewsHashSet>,
    packs_file: JsonFile<PacksSnapshot>,
}

impl DiffStore {
    /// Load all three units from `dir`. Never fails: bad or absent files start empty.
    pub async fn open(dir: impl AsRef<Path>) -> Self {
        let dir: PathBuf = dir.as_ref().to_path_buf();
        let endpoints_file: JsonFile<EndpointSnapshot> = JsonFile::new(dir.join(ENDPOINTS_FILE));
        let news_file: JsonFile<NewsHashSet> = JsonFile::new(dir.join(NEWS_HASHES_FILE));
        let packs_file: JsonFile<PacksSnapshot> = JsonFile::new(dir.join(PACKS_FILE));

        let endpoints = endpoints_file.load().await;
        let news_hashes = news_file.load().await;
        let packs = packs_file.load().await;

        tracing::info!(
            state_dir = %dir.display(),
            endpoints = endpoints.0.len(),
            news_hashes = news_hashes.len(),
            packs = packs.len(),
            "diff store loaded"
        );

        Self {
            endpoints,
            news_hashes,
            packs,
            endpoints_file,
            news_file,
            packs_file,
        }
    }

    /// Flush the news hash set.
    pub async fn save_news(&self) -> Result<()> {
        self.news_file.save(&self.news_hashes).await
    }

    /// Flush the endpoint and packs snapshots. Both are attempted even if the first fails.
    pub async fn save_snapshots(&self) -> Result<()> {
        let endpoints = self.endpoints_file.save(&self.endpoints).await;
        let packs = self.packs_file.save(&self.packs).await;
        endpoints.and(packs)
    }
}
