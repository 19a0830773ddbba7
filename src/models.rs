use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub image: String,
    pub floor_price: Decimal,
    pub volume_24h: Decimal,
    pub volume_7d: Decimal,
    pub volume_all_time: Decimal,
    pub owners: u64,
    pub total_supply: u64,
    pub change_24h: Decimal,
    pub change_7d: Decimal,
    pub description: String,
    pub contract_address: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub royalties: u32,
    pub sales_24h: u64,
    pub sales_7d: u64,
    pub market_cap: Decimal,
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioItem {
    #[serde(flatten)]
    pub collection: Collection,
    pub owned_count: u64,
    pub floor_value: Decimal,
    pub total_value: Decimal,
}

/// One page of a listing call. `continuation` is the only signal that a
/// further page exists; upstream never reports a total.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollectionPage {
    pub collections: Vec<Collection>,
    pub continuation: Option<String>,
}

impl CollectionPage {
    pub fn has_next(&self) -> bool {
        self.continuation.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

/// Headline figures over the collections currently shown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_collections: u64,
    pub total_volume_24h: Decimal,
    /// Mean floor over collections with a positive floor only.
    pub avg_floor_price: Decimal,
    pub total_owners: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletStats {
    pub total_transactions: u64,
    pub gas_spent: Decimal,
    /// Gas spent times a fixed multiplier. Not a measured volume.
    pub total_volume: Decimal,
    pub nft_bag_value: Decimal,
    pub longest_streak: u32,
    /// Simulated rank; no leaderboard exists upstream.
    pub position: u64,
    pub total_score: u64,
    pub total_users: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletSource {
    TransactionHistory,
    NftHoldings,
    TokenBalance,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletReport {
    pub address: String,
    pub stats: WalletStats,
    pub nft_count: u64,
    pub token_balance: Decimal,
    /// Sources that failed and were replaced by zero defaults.
    pub degraded: Vec<WalletSource>,
}

impl WalletReport {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl std::str::FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            other => Err(format!("unknown network {other:?}")),
        }
    }
}

/// Simulated chain statistics shown next to the market data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStats {
    pub block_height: u64,
    pub tps: u64,
    pub gas_price: Decimal,
    pub active_validators: u32,
    pub network: Network,
}
