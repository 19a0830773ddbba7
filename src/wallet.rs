//! Wallet analytics assembled from three independent sources.
//!
//! Each source is best-effort: a failure is logged, its fields fall back to
//! zero and the source is listed in [`WalletReport::degraded`]. The
//! aggregate itself only fails on a blank address or a gas total too large
//! for a decimal.

use futures_util::future::join3;
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use url::Url;

use crate::{
    config::Config,
    error::{AggregateError, FetchError},
    http::{endpoint_label, extend_path, HttpClient},
    models::{WalletReport, WalletSource, WalletStats},
};

/// Reference population shown next to the simulated position.
pub const TOTAL_USERS: u64 = 2_500_000;
pub const MAX_ACTIVITY_SCORE: u64 = 10_000;
/// Heuristic: volume is approximated as gas spent times this factor.
pub const VOLUME_PER_GAS: Decimal = dec!(50);
/// Flat per-NFT valuation used until real pricing exists.
pub const NFT_UNIT_VALUE: Decimal = dec!(0.8);
pub const RECENT_SAMPLE: usize = 30;

const SECS_PER_DAY: i64 = 86_400;
const WEI_SCALE: u32 = 18;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TxHistory {
    pub total_txs: u64,
    pub gas_spent_wei: u128,
    /// Unix timestamps of the most recent transactions, newest first.
    pub recent: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NftHoldings {
    pub count: u64,
    pub estimated_value: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenBalance {
    pub balance: Decimal,
}

#[derive(Clone)]
pub struct WalletAggregator {
    http: HttpClient,
    tx_history_url: Url,
    tx_history_api_key: Option<String>,
    nft_holdings_url: Url,
    token_balance_url: Url,
    token_balance_api_key: Option<String>,
}

impl WalletAggregator {
    pub fn from_config(http: HttpClient, config: &Config) -> Self {
        Self {
            http,
            tx_history_url: config.tx_history_url.clone(),
            tx_history_api_key: config.tx_history_api_key.clone(),
            nft_holdings_url: config.nft_holdings_url.clone(),
            token_balance_url: config.token_balance_url.clone(),
            token_balance_api_key: config.token_balance_api_key.clone(),
        }
    }

    pub async fn aggregate(&self, address: &str) -> Result<WalletReport, AggregateError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(AggregateError::EmptyAddress);
        }

        tracing::info!(address, "fetching wallet stats");
        let (tx, nfts, balance) = join3(
            self.transaction_history(address),
            self.nft_holdings(address),
            self.token_balance(address),
        )
        .await;

        merge(address, tx, nfts, balance, &mut rand::thread_rng())
    }

    pub async fn transaction_history(&self, address: &str) -> Result<TxHistory, FetchError> {
        let mut url = self.tx_history_url.clone();
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("module", "account")
                .append_pair("action", "txlist")
                .append_pair("address", address)
                .append_pair("startblock", "0")
                .append_pair("endblock", "99999999")
                .append_pair("page", "1")
                .append_pair("offset", "1000")
                .append_pair("sort", "desc");
            if let Some(key) = &self.tx_history_api_key {
                q.append_pair("apikey", key);
            }
        }

        let endpoint = endpoint_label(&url);
        let body = self.http.send_json(self.http.get(url), &endpoint).await?;
        parse_tx_history(&endpoint, &body)
    }

    pub async fn nft_holdings(&self, address: &str) -> Result<NftHoldings, FetchError> {
        let mut url = extend_path(&self.nft_holdings_url, &["getNFTs"])?;
        url.query_pairs_mut()
            .append_pair("owner", address)
            .append_pair("withMetadata", "true");

        let endpoint = endpoint_label(&url);
        let body = self.http.send_json(self.http.get(url), &endpoint).await?;
        let count = body
            .get("ownedNfts")
            .and_then(Value::as_array)
            .map(|nfts| nfts.len() as u64)
            .ok_or_else(|| FetchError::decode(&endpoint, "missing ownedNfts"))?;

        Ok(NftHoldings {
            count,
            estimated_value: Decimal::from(count) * NFT_UNIT_VALUE,
        })
    }

    pub async fn token_balance(&self, address: &str) -> Result<TokenBalance, FetchError> {
        let mut url = extend_path(&self.token_balance_url, &[address, "balance"])?;
        url.query_pairs_mut().append_pair("chain", "eth");

        let endpoint = endpoint_label(&url);
        let mut request = self.http.get(url);
        if let Some(key) = &self.token_balance_api_key {
            request = request.header("X-API-Key", key);
        }
        let body = self.http.send_json(request, &endpoint).await?;

        let wei = body
            .get("balance")
            .and_then(wei_value)
            .ok_or_else(|| FetchError::decode(&endpoint, "missing balance"))?;
        Ok(TokenBalance {
            balance: wei_to_native(wei).unwrap_or_default(),
        })
    }
}

fn parse_tx_history(endpoint: &str, body: &Value) -> Result<TxHistory, FetchError> {
    let result = body.get("result").and_then(Value::as_array);
    let status = body.get("status").and_then(Value::as_str);

    let txs = match (status, result) {
        (Some("1"), Some(txs)) => txs,
        // Etherscan answers status "0" with an empty list for fresh wallets.
        (_, Some(txs)) if txs.is_empty() => return Ok(TxHistory::default()),
        _ => {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unexpected payload");
            return Err(FetchError::decode(endpoint, message));
        }
    };

    let gas_spent_wei = txs
        .iter()
        .map(|tx| {
            let used = tx.get("gasUsed").and_then(wei_value).unwrap_or(0);
            let price = tx.get("gasPrice").and_then(wei_value).unwrap_or(0);
            used.saturating_mul(price)
        })
        .fold(0u128, u128::saturating_add);

    let recent = txs
        .iter()
        .take(RECENT_SAMPLE)
        .filter_map(|tx| {
            let ts = tx.get("timeStamp")?;
            ts.as_i64()
                .or_else(|| ts.as_str().and_then(|s| s.trim().parse().ok()))
        })
        .collect();

    Ok(TxHistory {
        total_txs: txs.len() as u64,
        gas_spent_wei,
        recent,
    })
}

fn wei_value(v: &Value) -> Option<u128> {
    match v {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_u64().map(u128::from),
        _ => None,
    }
}

fn wei_to_native(wei: u128) -> Option<Decimal> {
    let wei = i128::try_from(wei).ok()?;
    Decimal::try_from_i128_with_scale(wei, WEI_SCALE).ok()
}

fn fixed(value: Decimal, dp: u32) -> Decimal {
    let mut v = value.round_dp(dp);
    v.rescale(dp);
    v
}

/// Combines settled source results into a report. Failed sources
/// contribute zeros and are listed as degraded.
pub fn merge<R: Rng>(
    address: &str,
    tx: Result<TxHistory, FetchError>,
    nfts: Result<NftHoldings, FetchError>,
    balance: Result<TokenBalance, FetchError>,
    rng: &mut R,
) -> Result<WalletReport, AggregateError> {
    let mut degraded = Vec::new();
    let tx = settle(tx, WalletSource::TransactionHistory, &mut degraded);
    let nfts = settle(nfts, WalletSource::NftHoldings, &mut degraded);
    let balance = settle(balance, WalletSource::TokenBalance, &mut degraded);

    let gas_spent = wei_to_native(tx.gas_spent_wei)
        .ok_or(AggregateError::GasOverflow(tx.gas_spent_wei))?;
    let gas_spent = fixed(gas_spent, 4);
    let total_score = activity_score(tx.total_txs, nfts.count);

    let stats = WalletStats {
        total_transactions: tx.total_txs,
        gas_spent,
        total_volume: estimated_volume(gas_spent),
        nft_bag_value: fixed(nfts.estimated_value, 2),
        longest_streak: longest_streak(&tx.recent),
        position: leaderboard_position(total_score, rng),
        total_score,
        total_users: TOTAL_USERS,
    };

    tracing::debug!(address, ?stats, ?degraded, "wallet stats merged");
    Ok(WalletReport {
        address: address.to_string(),
        stats,
        nft_count: nfts.count,
        token_balance: balance.balance,
        degraded,
    })
}

fn settle<T: Default>(
    result: Result<T, FetchError>,
    source: WalletSource,
    degraded: &mut Vec<WalletSource>,
) -> T {
    result.unwrap_or_else(|err| {
        tracing::warn!(?source, error = %err, "wallet source failed, using defaults");
        degraded.push(source);
        T::default()
    })
}

pub fn estimated_volume(gas_spent: Decimal) -> Decimal {
    fixed(gas_spent * VOLUME_PER_GAS, 2)
}

pub fn activity_score(total_txs: u64, nft_count: u64) -> u64 {
    total_txs
        .saturating_mul(2)
        .saturating_add(nft_count.saturating_mul(10))
        .min(MAX_ACTIVITY_SCORE)
}

/// Longest run of consecutive calendar days (UTC) in a newest-first
/// timestamp sample. Several transactions on one day count once; a one-day
/// gap extends the run, anything longer starts a new one.
pub fn longest_streak(timestamps: &[i64]) -> u32 {
    let mut longest = 0;
    let mut current = 0;
    let mut last_day: Option<i64> = None;

    for ts in timestamps {
        let day = ts.div_euclid(SECS_PER_DAY);
        current = match last_day.map(|prev| (prev - day).abs()) {
            None => 1,
            Some(0) => current,
            Some(1) => current + 1,
            Some(_) => 1,
        };
        longest = longest.max(current);
        last_day = Some(day);
    }

    longest
}

/// Simulated rank, uniform within a band picked by activity score.
pub fn leaderboard_position<R: Rng>(score: u64, rng: &mut R) -> u64 {
    match score {
        s if s > 5000 => rng.gen_range(1..=1_000),
        s if s > 2000 => rng.gen_range(1_000..=6_000),
        s if s > 500 => rng.gen_range(5_000..=25_000),
        _ => rng.gen_range(25_000..=125_000),
    }
}
