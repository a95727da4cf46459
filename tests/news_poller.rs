// tests/news_poller.rs
//
// News poller: two-step device token exchange, hash-based diffing and the
// immediate flush of the hash set.

mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use asset_watcher::poll::{DeviceAuth, NewsFeedParams, NewsPoller};
use asset_watcher::store::{DiffStore, NEWS_HASHES_FILE};
use asset_watcher::SourcePoller;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Form, Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

use common::{client, serve, set, temp_store};

#[derive(Clone, Default)]
struct Upstream {
    feed_bodies: Arc<Mutex<Vec<Value>>>,
    reject_tokens: bool,
}

fn header<'a>(h: &'a HeaderMap, name: &str) -> &'a str {
    h.get(name).and_then(|v| v.to_str().ok()).unwrap_or_default()
}

async fn token(
    State(up): State<Upstream>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    if up.reject_tokens || header(&headers, "authorization") != "basic bGF1bmNoZXI6c2VjcmV0" {
        return (StatusCode::UNAUTHORIZED, "bad client").into_response();
    }
    match form.get("grant_type").map(String::as_str) {
        Some("device_auth")
            if form.get("device_id").map(String::as_str) == Some("dev-1")
                && form.get("secret").map(String::as_str) == Some("dev-secret")
                && form.get("account_id").map(String::as_str) == Some("acc-1") =>
        {
            Json(json!({"refresh_token": "refresh-1"})).into_response()
        }
        Some("refresh_token")
            if form.get("refresh_token").map(String::as_str) == Some("refresh-1")
                && form.get("token_type").map(String::as_str) == Some("eg1")
                && header(&headers, "x-epic-device-id") == "dev-1" =>
        {
            Json(json!({"access_token": "access-1"})).into_response()
        }
        _ => (StatusCode::BAD_REQUEST, "unexpected grant").into_response(),
    }
}

async fn feed(State(up): State<Upstream>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if header(&headers, "authorization") != "Bearer access-1" {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    up.feed_bodies.lock().push(body);
    Json(json!({
        "contentItems": [
            {"contentHash": "h1", "contentFields": {"image": "https://news/h1.png"}},
            {"contentHash": "h2", "contentFields": {
                "image": [{"url": "https://news/h2-wide.jpg"}, {"url": "https://news/h2-a-square.jpg"}],
                "title": "Season launch"
            }},
            {"contentHash": "", "contentFields": {"image": "https://news/nohash.png"}},
            {"contentFields": {"image": "https://news/missing.png"}}
        ]
    }))
    .into_response()
}

async fn start(up: Upstream) -> NewsPoller {
    let app = Router::new()
        .route("/token", post(token))
        .route("/feed", post(feed))
        .with_state(up);
    let base = serve(app).await;
    let auth = DeviceAuth {
        client_basic: "bGF1bmNoZXI6c2VjcmV0".into(),
        device_id: "dev-1".into(),
        secret: "dev-secret".into(),
        account_id: "acc-1".into(),
    };
    NewsPoller::new(client(), auth)
        .with_urls(format!("{base}/token"), format!("{base}/feed"))
        .with_request_delay(Duration::ZERO)
}

#[tokio::test]
async fn new_hash_yields_one_asset_and_hash_set_mirrors_feed() {
    let up = Upstream::default();
    let poller = start(up.clone()).await;
    let (dir, mut store) = temp_store().await;
    store.news_hashes = set(&["h1", "stale"]);

    let detected = poller.poll(&mut store).await.unwrap();

    assert_eq!(detected, set(&["https://news/h2-a-square.jpg"]));
    assert_eq!(store.news_hashes, set(&["h1", "h2"]));

    // Flushed immediately, without waiting for the rest of the cycle.
    assert!(dir.path().join(NEWS_HASHES_FILE).exists());
    let reloaded = DiffStore::open(dir.path()).await;
    assert_eq!(reloaded.news_hashes, set(&["h1", "h2"]));

    let bodies = up.feed_bodies.lock().clone();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["tags"], json!(["Product.BR"]));
    assert_eq!(bodies[0]["parameters"]["serverRegion"], json!("EU"));
}

#[tokio::test]
async fn unchanged_feed_detects_nothing() {
    let poller = start(Upstream::default()).await;
    let (_dir, mut store) = temp_store().await;

    assert_eq!(poller.poll(&mut store).await.unwrap().len(), 2);
    assert!(poller.poll(&mut store).await.unwrap().is_empty());
}

#[tokio::test]
async fn rejected_token_fails_without_touching_state() {
    let poller = start(Upstream {
        reject_tokens: true,
        ..Upstream::default()
    })
    .await;
    let (dir, mut store) = temp_store().await;
    store.news_hashes = set(&["h1"]);

    let err = poller.poll(&mut store).await.unwrap_err();

    assert!(format!("{err:#}").contains("device_auth"), "{err:#}");
    assert_eq!(store.news_hashes, set(&["h1"]));
    assert!(!dir.path().join(NEWS_HASHES_FILE).exists());
}

#[tokio::test]
async fn feed_request_carries_configured_params() {
    let up = Upstream::default();
    let mut params = NewsFeedParams::default();
    params.parameters.language = "fr".into();
    params.parameters.country = "FR".into();
    let poller = start(up.clone()).await.with_params(params);
    let (_dir, mut store) = temp_store().await;

    poller.poll(&mut store).await.unwrap();

    let bodies = up.feed_bodies.lock().clone();
    assert_eq!(bodies[0]["parameters"]["language"], json!("fr"));
    assert_eq!(bodies[0]["parameters"]["country"], json!("FR"));
    assert_eq!(bodies[0]["parameters"]["platform"], json!("Windows"));
}
