use std::env;
use std::time::Duration;

use url::Url;

use crate::{filter::ECOSYSTEM_KEYWORDS, http::DEFAULT_TIMEOUT, marketplace::DEFAULT_PAGE_SIZE};

pub const DEFAULT_MARKETPLACE_URL: &str = "https://api-mainnet.magiceden.dev/v3/rtp/ethereum";
pub const DEFAULT_TX_HISTORY_URL: &str = "https://api.etherscan.io/api";
pub const DEFAULT_NFT_HOLDINGS_URL: &str = "https://eth-mainnet.g.alchemy.com/v2/demo";
pub const DEFAULT_TOKEN_BALANCE_URL: &str = "https://deep-index.moralis.io/api/v2";
pub const DEFAULT_PRICE_URL: &str = "https://api.coingecko.com/api/v3";

#[derive(Debug, Clone)]
pub struct Config {
    pub marketplace_url: Url,
    pub marketplace_api_key: Option<String>,
    pub tx_history_url: Url,
    pub tx_history_api_key: Option<String>,
    pub nft_holdings_url: Url,
    pub token_balance_url: Url,
    pub token_balance_api_key: Option<String>,
    pub price_url: Url,
    pub http_bind_addr: String,
    pub http_timeout: Duration,
    pub page_size: u32,
    pub trending_period: String,
    pub ecosystem_keywords: Vec<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{var} is not a valid url: {value}")]
    InvalidUrl { var: &'static str, value: String },
    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Blank values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let url = |var: &'static str, default: &str| -> Result<Url, ConfigError> {
            let value = get(var).unwrap_or_else(|| default.to_string());
            Url::parse(&value).map_err(|_| ConfigError::InvalidUrl { var, value })
        };

        let positive = |var: &'static str, default: u64| -> Result<u64, ConfigError> {
            match get(var) {
                None => Ok(default),
                Some(value) => match value.parse::<u64>() {
                    Ok(n) if n > 0 => Ok(n),
                    _ => Err(ConfigError::InvalidNumber { var, value }),
                },
            }
        };

        let page_size = positive("PAGE_SIZE", u64::from(DEFAULT_PAGE_SIZE))?;
        let page_size = u32::try_from(page_size).map_err(|_| ConfigError::InvalidNumber {
            var: "PAGE_SIZE",
            value: page_size.to_string(),
        })?;

        let default_timeout_ms = u64::try_from(DEFAULT_TIMEOUT.as_millis()).unwrap_or(u64::MAX);

        let ecosystem_keywords = get("ECOSYSTEM_KEYWORDS")
            .map(parse_keywords)
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| ECOSYSTEM_KEYWORDS.iter().map(|k| k.to_string()).collect());

        Ok(Self {
            marketplace_url: url("MARKETPLACE_BASE_URL", DEFAULT_MARKETPLACE_URL)?,
            marketplace_api_key: get("MARKETPLACE_API_KEY"),
            tx_history_url: url("TX_HISTORY_URL", DEFAULT_TX_HISTORY_URL)?,
            tx_history_api_key: get("TX_HISTORY_API_KEY"),
            nft_holdings_url: url("NFT_HOLDINGS_URL", DEFAULT_NFT_HOLDINGS_URL)?,
            token_balance_url: url("TOKEN_BALANCE_URL", DEFAULT_TOKEN_BALANCE_URL)?,
            token_balance_api_key: get("TOKEN_BALANCE_API_KEY"),
            price_url: url("PRICE_URL", DEFAULT_PRICE_URL)?,
            http_bind_addr: get("HTTP_BIND").unwrap_or_else(|| "127.0.0.1:8080".to_string()),
            http_timeout: Duration::from_millis(positive("HTTP_TIMEOUT_MS", default_timeout_ms)?),
            page_size,
            trending_period: get("TRENDING_PERIOD").unwrap_or_else(|| "1d".to_string()),
            ecosystem_keywords,
        })
    }
}

fn parse_keywords(raw: String) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
