use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::Notifier;

pub const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

const MAX_ATTEMPTS: u8 = 3;

/// Posts asset cards to one Discord channel through the bot REST API.
#[derive(Clone)]
pub struct DiscordNotifier {
    api_base: String,
    token: String,
    channel_id: u64,
    client: Client,
    timeout: Duration,
}

impl DiscordNotifier {
    pub fn new(token: String, channel_id: u64) -> Self {
        Self {
            api_base: DISCORD_API_BASE.to_string(),
            token,
            channel_id,
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.token)
    }

    /// Check the bot token and that the channel is reachable. Returns the channel name.
    pub async fn verify(&self) -> Result<String> {
        let me: BotUser = self
            .client
            .get(format!("{}/users/@me", self.api_base))
            .timeout(self.timeout)
            .header(reqwest::header::AUTHORIZATION, self.auth())
            .send()
            .await
            .context("discord: fetch bot user")?
            .error_for_status()
            .context("discord: bot token rejected")?
            .json()
            .await
            .context("discord: parse bot user")?;
        tracing::info!(user = %me.username, id = %me.id, "logged in to discord");

        let channel: ChannelInfo = self
            .client
            .get(format!("{}/channels/{}", self.api_base, self.channel_id))
            .timeout(self.timeout)
            .header(reqwest::header::AUTHORIZATION, self.auth())
            .send()
            .await
            .context("discord: fetch channel")?
            .error_for_status()
            .with_context(|| format!("discord: channel {} not found or not accessible", self.channel_id))?
            .json()
            .await
            .context("discord: parse channel")?;
        Ok(channel.name.unwrap_or_else(|| channel.id.clone()))
    }

    async fn post_message(&self, payload: &MessagePayload) -> Result<()> {
        let url = format!("{}/channels/{}/messages", self.api_base, self.channel_id);

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&url)
                .timeout(self.timeout)
                .header(reqwest::header::AUTHORIZATION, self.auth())
                .json(payload)
                .send()
                .await;

            let wait = match res {
                Ok(rsp) if rsp.status().is_success() => return Ok(()),
                Ok(rsp) if rsp.status() == StatusCode::TOO_MANY_REQUESTS => {
                    let body: RateLimited = rsp.json().await.unwrap_or_default();
                    if attempt >= MAX_ATTEMPTS {
                        bail!("discord rate limited (retry_after {}s)", body.retry_after);
                    }
                    Duration::from_secs_f64(body.retry_after.clamp(0.0, 60.0))
                }
                Ok(rsp) => {
                    let status = rsp.status();
                    if attempt >= MAX_ATTEMPTS || status.is_client_error() {
                        let text = rsp.text().await.unwrap_or_default();
                        return Err(anyhow!("discord HTTP {status}: {text}"));
                    }
                    Duration::from_millis(500u64 << (attempt - 1))
                }
                Err(e) => {
                    if attempt >= MAX_ATTEMPTS {
                        return Err(anyhow!("discord request failed: {e}"));
                    }
                    Duration::from_millis(500u64 << (attempt - 1))
                }
            };
            tokio::time::sleep(wait).await;
        }
    }
}

#[async_trait::async_trait]
impl Notifier for DiscordNotifier {
    async fn send_asset(&self, url: &str) -> Result<()> {
        self.post_message(&MessagePayload::asset_card(url)).await
    }
}

#[derive(Deserialize)]
struct BotUser {
    id: String,
    username: String,
}

#[derive(Deserialize)]
struct ChannelInfo {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize, Default)]
struct RateLimited {
    #[serde(default)]
    retry_after: f64,
}

#[derive(Serialize)]
struct Thumbnail {
    url: String,
}

#[derive(Serialize)]
struct Embed {
    description: String,
    thumbnail: Thumbnail,
}

#[derive(Serialize)]
struct MessagePayload {
    embeds: Vec<Embed>,
}

impl MessagePayload {
    /// Card showing the asset as thumbnail with its URL as caption.
    fn asset_card(url: &str) -> Self {
        Self {
            embeds: vec![Embed {
                description: url.to_string(),
                thumbnail: Thumbnail {
                    url: url.to_string(),
                },
            }],
        }
    }
}
