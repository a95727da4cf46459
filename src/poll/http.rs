// src/poll/http.rs
//! GET-with-retry for rate-limited upstream endpoints.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::Value;

/// Header carrying the unix time (seconds) at which the rate-limit window resets.
pub const RATE_LIMIT_RESET_HEADER: &str = "X-RateLimit-Reset";

/// Upper bound on a single rate-limit sleep, pad included.
pub const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts per URL, including the first one.
    pub max_attempts: u32,
    /// Transient failures wait `backoff_unit * 2^attempt`.
    pub backoff_unit: Duration,
    /// Added to the time left until the rate-limit reset.
    pub rate_limit_pad: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_unit: Duration::from_secs(1),
            rate_limit_pad: Duration::from_secs(1),
            timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Wait after the `attempt`-th failed attempt (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_unit
            .saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX))
    }

    /// Wait after a 429: time until `reset_unix` (never negative) plus the pad,
    /// capped at [`MAX_RATE_LIMIT_WAIT`]. A missing or unparseable header counts
    /// as "already reset".
    pub fn rate_limit_wait(&self, reset_header: Option<&str>, now_unix: i64) -> Duration {
        let reset = reset_header
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(0);
        let remaining = u64::try_from(reset.saturating_sub(now_unix)).unwrap_or(0);
        let wait = Duration::from_secs(remaining).saturating_add(self.rate_limit_pad);
        if wait > MAX_RATE_LIMIT_WAIT {
            tracing::warn!(
                reset = reset_header.unwrap_or_default(),
                requested_secs = wait.as_secs(),
                capped_secs = MAX_RATE_LIMIT_WAIT.as_secs(),
                "rate-limit reset too far ahead, capping wait"
            );
            return MAX_RATE_LIMIT_WAIT;
        }
        wait
    }
}

enum Failure {
    RateLimited(Duration),
    Transient(anyhow::Error),
}

async fn attempt_once(client: &Client, url: &str, policy: &RetryPolicy) -> Result<Value, Failure> {
    let resp = client
        .get(url)
        .timeout(policy.timeout)
        .send()
        .await
        .map_err(|e| Failure::Transient(anyhow!(e).context("request failed")))?;

    let status = resp.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let reset = resp
            .headers()
            .get(RATE_LIMIT_RESET_HEADER)
            .and_then(|v| v.to_str().ok());
        let now = chrono::Utc::now().timestamp();
        return Err(Failure::RateLimited(policy.rate_limit_wait(reset, now)));
    }
    if !status.is_success() {
        return Err(Failure::Transient(anyhow!("unexpected status {status}")));
    }

    resp.json::<Value>()
        .await
        .context("invalid JSON body")
        .map_err(Failure::Transient)
}

/// GET `url` and parse the body as JSON, retrying per `policy`.
///
/// 429 responses sleep until the advertised reset; transport errors, non-2xx
/// statuses and bad bodies back off exponentially. Every retry consumes one
/// attempt. Returns the last failure once attempts run out.
pub async fn fetch_json_with_retry(client: &Client, url: &str, policy: &RetryPolicy) -> Result<Value> {
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        let last = attempt >= policy.max_attempts;

        match attempt_once(client, url, policy).await {
            Ok(v) => return Ok(v),
            Err(Failure::RateLimited(wait)) => {
                tracing::warn!(endpoint = url, attempt, wait_secs = wait.as_secs_f64(), "rate limited");
                if last {
                    return Err(anyhow!("rate limited after {attempt} attempts"));
                }
                tokio::time::sleep(wait).await;
            }
            Err(Failure::Transient(e)) => {
                let reason = format!("{e:#}");
                tracing::error!(endpoint = url, attempt, error = %reason, "fetch failed");
                if last {
                    return Err(e.context(format!("giving up after {attempt} attempts")));
                }
                tokio::time::sleep(policy.backoff(attempt)).await;
            }
        }
    }
}
