// src/telemetry.rs
//! Prometheus recorder for the poll and delivery counters.

use std::net::SocketAddr;

use anyhow::{anyhow, Context, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global recorder. With `listen` set, `/metrics` is also served
    /// on that address; otherwise counters are only reachable through `render`.
    /// Must be called from inside the tokio runtime.
    pub fn install(listen: Option<SocketAddr>) -> Result<Self> {
        let builder = PrometheusBuilder::new();
        let handle = match listen {
            Some(addr) => {
                let (recorder, exporter) = builder
                    .with_http_listener(addr)
                    .build()
                    .context("prometheus: build exporter")?;
                let handle = recorder.handle();
                metrics::set_global_recorder(recorder)
                    .map_err(|_| anyhow!("prometheus: a metrics recorder is already installed"))?;
                tokio::spawn(async move {
                    if let Err(e) = exporter.await {
                        tracing::error!(error = ?e, "metrics exporter stopped");
                    }
                });
                tracing::info!(%addr, "serving prometheus metrics");
                handle
            }
            None => builder
                .install_recorder()
                .context("prometheus: install recorder")?,
        };
        Ok(Self { handle })
    }

    /// Current counters in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}
