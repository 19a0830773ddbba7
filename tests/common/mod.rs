#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use nft_market_lab::config::Config;

pub const API_KEY: &str = "test-secret-key";
pub const DAY: i64 = 86_400;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub raw_query: Option<String>,
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Behavior {
    pub first_cursor: String,
    pub listing_status: Option<u16>,
    pub listing_empty: bool,
    pub nft_status: Option<u16>,
    pub nft_delay: Option<Duration>,
    pub price_status: Option<u16>,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            first_cursor: "t1".to_string(),
            listing_status: None,
            listing_empty: false,
            nft_status: None,
            nft_delay: None,
            price_status: None,
        }
    }
}

#[derive(Clone, Default)]
pub struct Upstream {
    pub requests: Arc<Mutex<Vec<Recorded>>>,
    pub behavior: Arc<Mutex<Behavior>>,
}

impl Upstream {
    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    pub fn set(&self, f: impl FnOnce(&mut Behavior)) {
        f(&mut self.behavior.lock());
    }

    fn record(&self, uri: &Uri, headers: &HeaderMap) -> Recorded {
        let query = uri
            .query()
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();
        let recorded = Recorded {
            path: uri.path().to_string(),
            raw_query: uri.query().map(str::to_string),
            query,
            authorization: headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        };
        self.requests.lock().push(recorded.clone());
        recorded
    }
}

pub fn raw_collection(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "symbol": id.to_uppercase(),
        "floorAsk": {"price": {"amount": {"decimal": 0.5}}},
        "volume": {"allTime": 100},
        "ownerCount": 10
    })
}

fn failure(status: u16) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({"message": "upstream failure"}))).into_response()
}

async fn listing(State(up): State<Upstream>, uri: Uri, headers: HeaderMap) -> Response {
    let request = up.record(&uri, &headers);
    let behavior = up.behavior.lock().clone();
    if let Some(status) = behavior.listing_status {
        return failure(status);
    }
    if behavior.listing_empty {
        return Json(json!({"collections": [], "continuation": null})).into_response();
    }

    let body = match request.query.get("continuation").cloned() {
        None => json!({
            "collections": [raw_collection("a1", "Alpha One"), raw_collection("a2", "Alpha Two")],
            "continuation": behavior.first_cursor,
        }),
        Some(c) if c == behavior.first_cursor => json!({
            "collections": [raw_collection("b1", "Beta One")],
            "continuation": null,
        }),
        Some(_) => json!({"collections": []}),
    };
    Json(body).into_response()
}

async fn search(State(up): State<Upstream>, uri: Uri, headers: HeaderMap) -> Response {
    let request = up.record(&uri, &headers);
    let status = up.behavior.lock().listing_status;
    if let Some(status) = status {
        return failure(status);
    }
    let name = request
        .query
        .get("name")
        .cloned()
        .unwrap_or_default()
        .to_lowercase();
    let all = [("s1", "Ape Club"), ("s2", "Ape Yacht"), ("s3", "Monad Monks")];
    let hits: Vec<Value> = all
        .iter()
        .filter(|(_, n)| n.to_lowercase().contains(&name))
        .map(|(id, n)| raw_collection(id, n))
        .collect();
    Json(json!({"collections": hits})).into_response()
}

async fn trending(State(up): State<Upstream>, uri: Uri, headers: HeaderMap) -> Response {
    let _ = up.record(&uri, &headers);
    let status = up.behavior.lock().listing_status;
    if let Some(status) = status {
        return failure(status);
    }
    Json(json!({
        "collections": [raw_collection("t1", "Hot One"), raw_collection("t2", "Hot Two")]
    }))
    .into_response()
}

async fn holdings(
    State(up): State<Upstream>,
    Path(_address): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let _ = up.record(&uri, &headers);
    Json(json!({
        "collections": [
            {"collection": raw_collection("h1", "Monad Monks"), "tokenCount": "2"},
            {"collection": raw_collection("h2", "Bored Apes"), "tokenCount": "1"},
            {"collection": raw_collection("h3", "Genesis Pass"), "tokenCount": "4", "totalValue": 9}
        ]
    }))
    .into_response()
}

async fn tx_history(State(up): State<Upstream>, uri: Uri, headers: HeaderMap) -> Response {
    let _ = up.record(&uri, &headers);
    let newest = 1_700_000_000 / DAY * DAY + 3_600;
    let txs: Vec<Value> = (0..10)
        .map(|i| {
            json!({
                "timeStamp": (newest - i * DAY).to_string(),
                "gasUsed": "1000000",
                "gasPrice": "10000000000"
            })
        })
        .collect();
    Json(json!({"status": "1", "message": "OK", "result": txs})).into_response()
}

async fn nfts(State(up): State<Upstream>, uri: Uri, headers: HeaderMap) -> Response {
    let _ = up.record(&uri, &headers);
    let behavior = up.behavior.lock().clone();
    if let Some(delay) = behavior.nft_delay {
        tokio::time::sleep(delay).await;
    }
    if let Some(status) = behavior.nft_status {
        return failure(status);
    }
    Json(json!({"ownedNfts": [{}, {}, {}]})).into_response()
}

async fn balance(
    State(up): State<Upstream>,
    Path(_address): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let _ = up.record(&uri, &headers);
    Json(json!({"balance": "1500000000000000000"})).into_response()
}

async fn price(State(up): State<Upstream>, uri: Uri, headers: HeaderMap) -> Response {
    let _ = up.record(&uri, &headers);
    let status = up.behavior.lock().price_status;
    if let Some(status) = status {
        return failure(status);
    }
    Json(json!({"ethereum": {"usd": 3000}})).into_response()
}

pub async fn spawn_upstream() -> (String, Upstream, JoinHandle<()>) {
    let upstream = Upstream::default();
    let app = Router::new()
        .route("/rtp/collections/v7", get(listing))
        .route("/rtp/search/collections/v2", get(search))
        .route("/rtp/collections/trending/v1", get(trending))
        .route("/rtp/users/:address/collections/v3", get(holdings))
        .route("/etherscan/api", get(tx_history))
        .route("/alchemy/getNFTs", get(nfts))
        .route("/moralis/:address/balance", get(balance))
        .route("/coingecko/simple/price", get(price))
        .with_state(upstream.clone());

    let (base_url, handle) = serve(app).await;
    (base_url, upstream, handle)
}

pub async fn serve(app: Router) -> (String, JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);
    let server = axum::serve(listener, app);
    let handle = tokio::spawn(async move {
        let _ = server.await;
    });
    (base_url, handle)
}

pub fn config_for(base_url: &str, api_key: Option<&str>) -> Config {
    let mut vars: HashMap<&str, String> = HashMap::from([
        ("MARKETPLACE_BASE_URL", format!("{base_url}/rtp")),
        ("TX_HISTORY_URL", format!("{base_url}/etherscan/api")),
        ("NFT_HOLDINGS_URL", format!("{base_url}/alchemy")),
        ("TOKEN_BALANCE_URL", format!("{base_url}/moralis")),
        ("PRICE_URL", format!("{base_url}/coingecko")),
        ("HTTP_TIMEOUT_MS", "300".to_string()),
        ("PAGE_SIZE", "2".to_string()),
    ]);
    if let Some(key) = api_key {
        vars.insert("MARKETPLACE_API_KEY", key.to_string());
    }
    Config::from_lookup(|k| vars.get(k).cloned()).unwrap()
}
