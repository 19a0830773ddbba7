mod common;

use reqwest::Client;
use tokio::task::JoinHandle;

use nft_market_lab::api::{app_router, AppState};
use nft_market_lab::http::HttpClient;
use nft_market_lab::marketplace::MarketplaceClient;

use common::{config_for, serve, spawn_upstream, Upstream, API_KEY};

async fn spawn_proxy(api_key: Option<&str>) -> (String, Upstream, Vec<JoinHandle<()>>) {
    let (upstream_url, upstream, upstream_handle) = spawn_upstream().await;
    let config = config_for(&upstream_url, api_key);
    let http = HttpClient::new(config.http_timeout).unwrap();
    let state = AppState {
        marketplace: MarketplaceClient::from_config(http, &config),
    };
    let (base_url, proxy_handle) = serve(app_router(state)).await;
    (base_url, upstream, vec![upstream_handle, proxy_handle])
}

fn stop(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        handle.abort();
    }
}

#[tokio::test]
async fn health_endpoint_works() {
    let (base_url, _upstream, handles) = spawn_proxy(Some(API_KEY)).await;
    let res = Client::new()
        .get(format!("{}/health", base_url))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body.get("status").and_then(|s| s.as_str()), Some("ok"));
    stop(handles);
}

#[tokio::test]
async fn proxy_forwards_query_and_credential() {
    let (base_url, upstream, handles) = spawn_proxy(Some(API_KEY)).await;
    let res = Client::new()
        .get(format!(
            "{}/api/magiceden/collections?sortBy=allTimeVolume&limit=5&name=a%20b",
            base_url
        ))
        .header("origin", "http://localhost:3000")
        .send()
        .await
        .unwrap();

    assert!(res.status().is_success());
    assert_eq!(
        res.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
    let text = res.text().await.unwrap();
    assert!(!text.contains(API_KEY));
    let body: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["continuation"], "t1");
    assert_eq!(body["collections"].as_array().map(Vec::len), Some(2));

    let seen = upstream.requests_to("/rtp/collections/v7");
    assert_eq!(seen.len(), 1);
    assert_eq!(
        seen[0].raw_query.as_deref(),
        Some("sortBy=allTimeVolume&limit=5&name=a%20b")
    );
    assert_eq!(
        seen[0].authorization.as_deref(),
        Some(format!("Bearer {API_KEY}").as_str())
    );
    stop(handles);
}

#[tokio::test]
async fn proxy_rejects_other_methods() {
    let (base_url, upstream, handles) = spawn_proxy(Some(API_KEY)).await;
    let res = Client::new()
        .post(format!("{}/api/magiceden/collections", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 405);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Method not allowed");
    assert!(upstream.requests_to("/rtp/collections/v7").is_empty());
    stop(handles);
}

#[tokio::test]
async fn proxy_reports_upstream_failure_as_500() {
    let (base_url, upstream, handles) = spawn_proxy(Some(API_KEY)).await;
    upstream.set(|b| b.listing_status = Some(502));

    let res = Client::new()
        .get(format!("{}/api/magiceden/collections?limit=5", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 500);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "HTTP error! status: 502");
    stop(handles);
}

#[tokio::test]
async fn proxy_without_credential_fails_without_calling_upstream() {
    let (base_url, upstream, handles) = spawn_proxy(None).await;
    let res = Client::new()
        .get(format!("{}/api/magiceden/collections", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 500);
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["error"].as_str().unwrap_or_default().contains("credential"));
    assert!(upstream.requests_to("/rtp/collections/v7").is_empty());
    stop(handles);
}
