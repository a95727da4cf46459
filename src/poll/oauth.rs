// src/poll/oauth.rs
//! Token exchanges against the upstream account service.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::Deserialize;

/// Account service token endpoint used by the news flow.
pub const DEVICE_TOKEN_URL: &str =
    "https://account-public-service-prod.ol.epicgames.com/account/api/oauth/token";
/// Account service token endpoint used by the catalog flow.
pub const CLIENT_TOKEN_URL: &str =
    "https://account-public-service-prod03.ol.epicgames.com/account/api/oauth/token";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Device credentials of the account the news feed is requested for.
#[derive(Debug, Clone)]
pub struct DeviceAuth {
    /// Pre-encoded `base64(client_id:client_secret)` of the launcher client.
    pub client_basic: String,
    pub device_id: String,
    pub secret: String,
    pub account_id: String,
}

async fn post_token(req: reqwest::RequestBuilder, what: &str) -> Result<TokenResponse> {
    let resp = req
        .send()
        .await
        .with_context(|| format!("{what}: request"))?
        .error_for_status()
        .with_context(|| format!("{what}: non-2xx"))?;
    resp.json::<TokenResponse>()
        .await
        .with_context(|| format!("{what}: parse token response"))
}

/// Step one of the news flow: trade device credentials for a refresh token.
pub async fn device_auth_refresh_token(
    client: &Client,
    token_url: &str,
    auth: &DeviceAuth,
    timeout: Duration,
) -> Result<String> {
    let form = [
        ("grant_type", "device_auth"),
        ("device_id", auth.device_id.as_str()),
        ("secret", auth.secret.as_str()),
        ("account_id", auth.account_id.as_str()),
    ];
    let req = client
        .post(token_url)
        .timeout(timeout)
        .header(AUTHORIZATION, format!("basic {}", auth.client_basic))
        .form(&form);

    let tok = post_token(req, "device_auth").await?;
    tracing::debug!("device_auth exchange ok");
    tok.refresh_token
        .filter(|t| !t.is_empty())
        .context("device_auth: response has no refresh_token")
}

/// Step two of the news flow: trade the refresh token for an `eg1` access token.
pub async fn refresh_access_token(
    client: &Client,
    token_url: &str,
    auth: &DeviceAuth,
    refresh_token: &str,
    timeout: Duration,
) -> Result<String> {
    let form = [
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
        ("token_type", "eg1"),
    ];
    let req = client
        .post(token_url)
        .timeout(timeout)
        .header(AUTHORIZATION, format!("basic {}", auth.client_basic))
        .header("X-Epic-Device-ID", auth.device_id.as_str())
        .form(&form);

    let tok = post_token(req, "refresh_token").await?;
    tracing::debug!("refresh_token exchange ok");
    tok.access_token
        .filter(|t| !t.is_empty())
        .context("refresh_token: response has no access_token")
}

/// Client-credentials grant with HTTP Basic auth of `client_id:client_secret`.
pub async fn client_credentials_token(
    client: &Client,
    token_url: &str,
    client_id: &str,
    client_secret: &str,
    timeout: Duration,
) -> Result<String> {
    let req = client
        .post(token_url)
        .timeout(timeout)
        .basic_auth(client_id, Some(client_secret))
        .form(&[("grant_type", "client_credentials")]);

    let tok = post_token(req, "client_credentials").await?;
    tok.access_token
        .filter(|t| !t.is_empty())
        .context("client_credentials: response has no access_token")
}
