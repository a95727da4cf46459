//! asset-watcher — binary entrypoint.
//! Loads configuration, verifies the Discord channel, then polls until Ctrl-C.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use asset_watcher::poll::{self, ContentPoller, NewsPoller, PacksPoller, SourcePoller};
use asset_watcher::telemetry::Metrics;
use asset_watcher::{scheduler, AppConfig, DiffStore, DiscordNotifier, UpdateOrchestrator};

/// `RUST_LOG` controls the filter; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,asset_watcher=debug"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env when present; real environment wins.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::from_env().context("invalid configuration")?;
    let metrics = Metrics::install(cfg.metrics_addr)?;

    let mut notifier = DiscordNotifier::new(cfg.discord_token.clone(), cfg.channel_id);
    if let Some(base) = &cfg.discord_api_base {
        notifier = notifier.with_api_base(base.clone());
    }
    let channel = notifier
        .verify()
        .await
        .context("channel not found, check CHANNEL_ID")?;
    tracing::info!(channel = %channel, "delivering to channel");

    let client = poll::build_http_client()?;
    let mut pollers: Vec<Box<dyn SourcePoller>> = vec![Box::new(
        ContentPoller::new(client.clone(), cfg.endpoints.clone()).with_request_delay(cfg.request_delay),
    )];
    match cfg.news.clone() {
        Some(auth) => pollers.push(Box::new(
            NewsPoller::new(client.clone(), auth)
                .with_params(cfg.news_params.clone())
                .with_request_delay(cfg.request_delay),
        )),
        None => tracing::warn!("news device credentials not set, news source disabled"),
    }
    pollers.push(Box::new(PacksPoller::new(client, cfg.packs.clone())));

    let store = DiffStore::open(&cfg.state_dir).await;
    let mut orchestrator = UpdateOrchestrator::new(pollers, store, Arc::new(notifier))
        .with_message_delay(cfg.message_delay);

    tracing::info!(
        endpoints = cfg.endpoints.len(),
        interval_secs = cfg.poll_interval.as_secs(),
        "watching for new assets"
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };
    scheduler::run_until(&mut orchestrator, cfg.poll_interval, shutdown).await;
    tracing::debug!(metrics = %metrics.render(), "final counters");

    Ok(())
}
