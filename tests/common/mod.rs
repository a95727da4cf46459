// tests/common/mod.rs
//
// Shared helpers: in-process stub servers and recording collaborators.
#![allow(dead_code)]

use std::time::Duration;

use anyhow::{anyhow, Result};
use asset_watcher::notify::Notifier;
use asset_watcher::poll::http::RetryPolicy;
use asset_watcher::store::DiffStore;
use asset_watcher::{AssetSet, SourcePoller};
use axum::Router;
use parking_lot::Mutex;

/// Serve `router` on an ephemeral localhost port; returns `http://127.0.0.1:PORT`.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("stub server");
    });
    format!("http://{addr}")
}

/// A localhost URL nobody listens on (connection refused).
pub async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind probe");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}/unreachable")
}

/// Same shape as production retries, but with millisecond waits.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        backoff_unit: Duration::from_millis(1),
        rate_limit_pad: Duration::from_millis(5),
        timeout: Duration::from_secs(2),
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::new()
}

pub fn set(items: &[&str]) -> AssetSet {
    items.iter().map(|s| s.to_string()).collect()
}

pub async fn temp_store() -> (tempfile::TempDir, DiffStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = DiffStore::open(dir.path()).await;
    (dir, store)
}

/// Notifier that remembers what it was asked to send; URLs in `fail_on` error out.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<String>>,
    pub fail_on: Vec<String>,
}

impl RecordingNotifier {
    pub fn failing_on(urls: &[&str]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_on: urls.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send_asset(&self, url: &str) -> Result<()> {
        if self.fail_on.iter().any(|u| u == url) {
            return Err(anyhow!("channel rejected {url}"));
        }
        self.sent.lock().push(url.to_string());
        Ok(())
    }
}

/// Poller returning a fixed set every time.
pub struct FixedPoller(pub &'static str, pub AssetSet);

#[async_trait::async_trait]
impl SourcePoller for FixedPoller {
    async fn poll(&self, _store: &mut DiffStore) -> Result<AssetSet> {
        Ok(self.1.clone())
    }

    fn name(&self) -> &'static str {
        self.0
    }
}

/// Poller that always fails, like a source whose token exchange is rejected.
pub struct FailingPoller(pub &'static str);

#[async_trait::async_trait]
impl SourcePoller for FailingPoller {
    async fn poll(&self, _store: &mut DiffStore) -> Result<AssetSet> {
        Err(anyhow!("oauth: 401 Unauthorized"))
    }

    fn name(&self) -> &'static str {
        self.0
    }
}

/// Poller that sleeps before answering, for interrupting a cycle mid-flight.
pub struct SlowPoller(pub Duration, pub AssetSet);

#[async_trait::async_trait]
impl SourcePoller for SlowPoller {
    async fn poll(&self, _store: &mut DiffStore) -> Result<AssetSet> {
        tokio::time::sleep(self.0).await;
        Ok(self.1.clone())
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}
