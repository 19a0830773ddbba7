use chrono::Utc;
use rand::Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use url::Url;

use crate::{
    config::Config,
    error::FetchError,
    http::{endpoint_label, extend_path, HttpClient},
    models::{Network, NetworkStats},
};

/// Price shown when the spot endpoint is unreachable.
pub const FALLBACK_PRICE: Decimal = dec!(12.50);
/// The native token is not listed anywhere yet; its display price is a
/// fixed fraction of the ETH spot price.
pub const PRICE_RATIO: Decimal = dec!(0.005);

const BASE_BLOCK_HEIGHT: u64 = 1_234_567;

#[derive(Clone)]
pub struct PriceClient {
    http: HttpClient,
    base_url: Url,
}

impl PriceClient {
    pub fn new(http: HttpClient, base_url: Url) -> Self {
        Self { http, base_url }
    }

    pub fn from_config(http: HttpClient, config: &Config) -> Self {
        Self::new(http, config.price_url.clone())
    }

    /// ETH/USD spot price scaled by [`PRICE_RATIO`].
    pub async fn spot_price(&self) -> Result<Decimal, FetchError> {
        let mut url = extend_path(&self.base_url, &["simple", "price"])?;
        url.query_pairs_mut()
            .append_pair("ids", "ethereum")
            .append_pair("vs_currencies", "usd");

        let endpoint = endpoint_label(&url);
        let body = self.http.send_json(self.http.get(url), &endpoint).await?;
        let usd = body
            .get("ethereum")
            .and_then(|e| e.get("usd"))
            .and_then(Value::as_f64)
            .and_then(Decimal::from_f64)
            .ok_or_else(|| FetchError::decode(&endpoint, "missing ethereum.usd"))?;

        Ok((usd * PRICE_RATIO).round_dp(4))
    }

    /// Spot price, or [`FALLBACK_PRICE`] when it cannot be fetched.
    pub async fn reference_price(&self) -> Decimal {
        match self.spot_price().await {
            Ok(price) => price,
            Err(err) => {
                tracing::warn!(error = %err, "price lookup failed, using fallback");
                FALLBACK_PRICE
            }
        }
    }
}

/// Simulated network statistics; there is no live chain to query.
pub fn network_stats<R: Rng>(network: Network, rng: &mut R) -> NetworkStats {
    let now = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
    NetworkStats {
        block_height: BASE_BLOCK_HEIGHT + now,
        tps: 10_000 + rng.gen_range(0..2_000),
        gas_price: dec!(0.001),
        active_validators: match network {
            Network::Testnet => 50,
            Network::Mainnet => 100,
        },
        network,
    }
}
