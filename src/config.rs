// src/config.rs
//! Process configuration, read once from the environment at startup.

use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

use crate::poll::content::DEFAULT_ENDPOINTS;
use crate::poll::{DeviceAuth, NewsFeedParams, PacksCredentials};

const ENV_ENDPOINTS_PATH: &str = "ENDPOINTS_PATH";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub discord_token: String,
    pub channel_id: u64,
    pub discord_api_base: Option<String>,
    pub packs: PacksCredentials,
    /// `None` disables the news source.
    pub news: Option<DeviceAuth>,
    pub news_params: NewsFeedParams,
    pub endpoints: Vec<String>,
    pub state_dir: PathBuf,
    pub poll_interval: Duration,
    pub request_delay: Duration,
    pub message_delay: Duration,
    /// Serve Prometheus `/metrics` here when set.
    pub metrics_addr: Option<SocketAddr>,
}

impl AppConfig {
    /// Read everything from the process environment. Missing required values are errors.
    pub fn from_env() -> Result<Self> {
        let discord_token = required("DISCORD_TOKEN")?;
        let channel_id = required("CHANNEL_ID")?
            .parse::<u64>()
            .context("CHANNEL_ID must be a numeric channel id")?;
        let packs = PacksCredentials {
            client_id: required("EPIC_CLIENT_ID")?,
            client_secret: required("EPIC_CLIENT_SECRET")?,
        };

        let news = match (
            optional("NEWS_CLIENT_BASIC"),
            optional("DEVICE_ID"),
            optional("DEVICE_SECRET"),
            optional("ACCOUNT_ID"),
        ) {
            (Some(client_basic), Some(device_id), Some(secret), Some(account_id)) => Some(DeviceAuth {
                client_basic,
                device_id,
                secret,
                account_id,
            }),
            _ => None,
        };

        Ok(Self {
            discord_token,
            channel_id,
            discord_api_base: optional("DISCORD_API_BASE"),
            packs,
            news,
            news_params: news_params(),
            endpoints: load_endpoints()?,
            state_dir: optional("STATE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            poll_interval: Duration::from_secs(parse_or("POLL_INTERVAL_SECS", 60)?),
            request_delay: Duration::from_millis(parse_or("REQUEST_DELAY_MS", 1000)?),
            message_delay: Duration::from_millis(parse_or("MESSAGE_DELAY_MS", 1000)?),
            metrics_addr: optional("METRICS_ADDR")
                .map(|v| {
                    v.parse::<SocketAddr>()
                        .with_context(|| format!("METRICS_ADDR must be host:port, got {v:?}"))
                })
                .transpose()?,
        })
    }
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(key: &str) -> Result<String> {
    optional(key).ok_or_else(|| anyhow!("missing required environment variable {key}"))
}

fn parse_or(key: &str, default: u64) -> Result<u64> {
    match optional(key) {
        Some(v) => v
            .parse()
            .with_context(|| format!("{key} must be a non-negative integer, got {v:?}")),
        None => Ok(default),
    }
}

/// Content endpoints: the list in `$ENDPOINTS_PATH` when set, otherwise the
/// built-in pages. The file is TOML (`endpoints = [...]`) when it ends in
/// `.toml`, a JSON array otherwise.
pub fn load_endpoints() -> Result<Vec<String>> {
    let Some(path) = optional(ENV_ENDPOINTS_PATH).map(PathBuf::from) else {
        return Ok(DEFAULT_ENDPOINTS.iter().map(|s| s.to_string()).collect());
    };
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("{ENV_ENDPOINTS_PATH}: reading {}", path.display()))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let list = dedupe(parse_endpoint_file(&raw, is_toml)?);
    if list.is_empty() {
        bail!("endpoint list in {} is empty", path.display());
    }
    Ok(list)
}

fn parse_endpoint_file(raw: &str, is_toml: bool) -> Result<Vec<String>> {
    #[derive(serde::Deserialize)]
    struct EndpointsFile {
        endpoints: Vec<String>,
    }
    if is_toml {
        let file: EndpointsFile = toml::from_str(raw).context("endpoints TOML")?;
        Ok(file.endpoints)
    } else {
        serde_json::from_str(raw).context("endpoints JSON array")
    }
}

/// Trimmed, non-blank, first occurrence kept so polling order survives.
fn dedupe(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .map(|it| it.trim().to_string())
        .filter(|it| !it.is_empty() && seen.insert(it.clone()))
        .collect()
}

fn news_params() -> NewsFeedParams {
    let mut params = NewsFeedParams::default();
    let p = &mut params.parameters;
    for (key, slot) in [
        ("NEWS_PLATFORM", &mut p.platform),
        ("NEWS_LANGUAGE", &mut p.language),
        ("NEWS_SERVER_REGION", &mut p.server_region),
        ("NEWS_COUNTRY", &mut p.country),
    ] {
        if let Some(v) = optional(key) {
            *slot = v;
        }
    }
    params
}
