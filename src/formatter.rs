//! Normalization of marketplace records.
//!
//! Upstream records are loosely typed: fields go missing, numbers arrive as
//! strings, nested objects are sometimes `null`. Every reader here falls
//! back to a fixed default, so a formatted [`Collection`] never has a gap.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::models::{Collection, PortfolioItem};

pub const PLACEHOLDER_IMAGE: &str = "data:image/svg+xml;base64,PHN2ZyB3aWR0aD0iNDAwIiBoZWlnaHQ9IjIwMCIgeG1sbnM9Imh0dHA6Ly93d3cudzMub3JnLzIwMDAvc3ZnIj48cmVjdCB3aWR0aD0iNDAwIiBoZWlnaHQ9IjIwMCIgZmlsbD0iIzYzNjZmMSIvPjx0ZXh0IHg9IjUwJSIgeT0iNTAlIiBmb250LWZhbWlseT0iQXJpYWwiIGZvbnQtc2l6ZT0iMjAiIGZpbGw9IndoaXRlIiB0ZXh0LWFuY2hvcj0ibWlkZGxlIiBkeT0iLjNlbSI+TkZUPC90ZXh0Pjwvc3ZnPg==";
pub const DEFAULT_NAME: &str = "Unknown Collection";
pub const DEFAULT_SYMBOL: &str = "N/A";
pub const DEFAULT_DESCRIPTION: &str = "NFT Collection";

pub fn format_collection(raw: &Value) -> Collection {
    let image = string_at(raw, &["image"])
        .or_else(|| {
            raw.get("sampleImages")
                .and_then(Value::as_array)
                .and_then(|images| images.iter().find_map(non_empty_str))
        })
        .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string());

    Collection {
        id: string_at(raw, &["id"])
            .or_else(|| string_at(raw, &["primaryContract"]))
            .unwrap_or_default(),
        name: string_at(raw, &["name"]).unwrap_or_else(|| DEFAULT_NAME.to_string()),
        symbol: string_at(raw, &["symbol"]).unwrap_or_else(|| DEFAULT_SYMBOL.to_string()),
        image,
        floor_price: amount_at(raw, &["floorAsk", "price", "amount", "decimal"]),
        volume_24h: amount_at(raw, &["volume", "1day"]),
        volume_7d: amount_at(raw, &["volume", "7day"]),
        volume_all_time: amount_at(raw, &["volume", "allTime"]),
        owners: count_at(raw, &["ownerCount"]),
        total_supply: count_at(raw, &["tokenCount"]),
        change_24h: decimal_at(raw, &["floorSaleChange", "1day"]).unwrap_or_default(),
        change_7d: decimal_at(raw, &["floorSaleChange", "7day"]).unwrap_or_default(),
        description: string_at(raw, &["description"])
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        contract_address: string_at(raw, &["primaryContract"]),
        created_at: string_at(raw, &["createdAt"]).and_then(|s| parse_timestamp(&s)),
        royalties: u32::try_from(count_at(raw, &["royalties", "bps"])).unwrap_or(u32::MAX),
        sales_24h: count_at(raw, &["salesCount", "1day"]),
        sales_7d: count_at(raw, &["salesCount", "7day"]),
        market_cap: amount_at(raw, &["marketCap"]),
        verified: raw.get("isVerified").and_then(Value::as_bool).unwrap_or(false),
    }
}

/// Formats one entry of a wallet's holdings: `{collection, tokenCount,
/// floorAskValue, totalValue}`. Total value is upstream's figure when it
/// supplies a positive one, otherwise owned count times floor price,
/// saturating at [`Decimal::MAX`].
pub fn format_portfolio_item(raw: &Value) -> PortfolioItem {
    let collection = format_collection(raw.get("collection").unwrap_or(&Value::Null));
    let owned_count = count_at(raw, &["tokenCount"]);
    let floor_value = amount_at(raw, &["floorAskValue"]);

    let total_value = match amount_at(raw, &["totalValue"]) {
        v if v > Decimal::ZERO => v,
        _ => collection
            .floor_price
            .checked_mul(Decimal::from(owned_count))
            .unwrap_or(Decimal::MAX),
    };

    PortfolioItem {
        collection,
        owned_count,
        floor_value,
        total_value,
    }
}

fn path<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().try_fold(raw, |v, key| v.get(key))
}

fn non_empty_str(v: &Value) -> Option<String> {
    v.as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn string_at(raw: &Value, keys: &[&str]) -> Option<String> {
    path(raw, keys).and_then(non_empty_str)
}

fn decimal_at(raw: &Value, keys: &[&str]) -> Option<Decimal> {
    match path(raw, keys)? {
        Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
                .or_else(|| n.as_f64().and_then(Decimal::from_f64))
        }
        Value::String(s) => {
            let s = s.trim();
            Decimal::from_str(s)
                .or_else(|_| Decimal::from_scientific(s))
                .ok()
        }
        _ => None,
    }
}

/// Non-negative decimal, 0 when absent or negative.
fn amount_at(raw: &Value, keys: &[&str]) -> Decimal {
    decimal_at(raw, keys)
        .filter(|d| d.is_sign_positive())
        .unwrap_or_default()
        .normalize()
}

fn count_at(raw: &Value, keys: &[&str]) -> u64 {
    match path(raw, keys) {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse::<u64>().unwrap_or(0),
        _ => 0,
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let c = format_collection(&json!({}));
        assert_eq!(c.floor_price, Decimal::ZERO);
        assert_eq!(c.owners, 0);
        assert!(!c.verified);
        assert_eq!(c.image, PLACEHOLDER_IMAGE);
        assert_eq!(c.description, "NFT Collection");
        assert_eq!(c.name, "Unknown Collection");
        assert_eq!(c.symbol, "N/A");
        assert_eq!(c.contract_address, None);
        assert_eq!(c.created_at, None);
    }

    #[test]
    fn non_object_input_degrades_to_defaults() {
        let c = format_collection(&json!("garbage"));
        assert_eq!(c.id, "");
        assert_eq!(c.total_supply, 0);
        assert_eq!(c.change_7d, Decimal::ZERO);
    }

    #[test]
    fn reads_nested_marketplace_fields() {
        let raw = json!({
            "id": "0xabc",
            "name": "Monad Monks",
            "symbol": "MONK",
            "sampleImages": ["", "https://img.example/1.png"],
            "floorAsk": {"price": {"amount": {"decimal": 1.25}}},
            "volume": {"1day": 10.5, "7day": "70", "allTime": 1234},
            "ownerCount": 321,
            "tokenCount": "10000",
            "floorSaleChange": {"1day": -0.12},
            "primaryContract": "0xcontract",
            "createdAt": "2024-05-01T12:00:00.000Z",
            "royalties": {"bps": 500},
            "salesCount": {"1day": 4, "7day": 30},
            "marketCap": 12500,
            "isVerified": true
        });

        let c = format_collection(&raw);
        assert_eq!(c.id, "0xabc");
        assert_eq!(c.image, "https://img.example/1.png");
        assert_eq!(c.floor_price, dec!(1.25));
        assert_eq!(c.volume_24h, dec!(10.5));
        assert_eq!(c.volume_7d, dec!(70));
        assert_eq!(c.volume_all_time, dec!(1234));
        assert_eq!(c.owners, 321);
        assert_eq!(c.total_supply, 10_000);
        assert_eq!(c.change_24h, dec!(-0.12));
        assert_eq!(c.change_7d, Decimal::ZERO);
        assert_eq!(c.contract_address.as_deref(), Some("0xcontract"));
        assert!(c.created_at.is_some());
        assert_eq!(c.royalties, 500);
        assert_eq!(c.sales_7d, 30);
        assert_eq!(c.market_cap, dec!(12500));
        assert!(c.verified);
    }

    #[test]
    fn wrong_types_use_defaults() {
        let raw = json!({
            "name": 42,
            "floorAsk": {"price": null},
            "ownerCount": "many",
            "isVerified": "yes",
            "volume": {"1day": -3}
        });
        let c = format_collection(&raw);
        assert_eq!(c.name, "Unknown Collection");
        assert_eq!(c.floor_price, Decimal::ZERO);
        assert_eq!(c.owners, 0);
        assert!(!c.verified);
        assert_eq!(c.volume_24h, Decimal::ZERO);
    }

    #[test]
    fn portfolio_total_derived_from_floor() {
        let raw = json!({
            "collection": {"id": "c1", "floorAsk": {"price": {"amount": {"decimal": 0.5}}}},
            "tokenCount": "3",
            "floorAskValue": 1.5
        });
        let item = format_portfolio_item(&raw);
        assert_eq!(item.owned_count, 3);
        assert_eq!(item.floor_value, dec!(1.5));
        assert_eq!(item.total_value, dec!(1.5));
    }

    #[test]
    fn portfolio_prefers_upstream_total() {
        let raw = json!({
            "collection": {"id": "c1", "floorAsk": {"price": {"amount": {"decimal": 0.5}}}},
            "tokenCount": 3,
            "totalValue": 9.75
        });
        let item = format_portfolio_item(&raw);
        assert_eq!(item.total_value, dec!(9.75));
    }

    #[test]
    fn portfolio_without_collection_still_formats() {
        let item = format_portfolio_item(&json!({"tokenCount": 2}));
        assert_eq!(item.collection.name, DEFAULT_NAME);
        assert_eq!(item.owned_count, 2);
        assert_eq!(item.total_value, Decimal::ZERO);
    }

    #[test]
    fn oversized_floor_saturates_total() {
        let raw = json!({
            "collection": {"floorAsk": {"price": {"amount": {"decimal": "70000000000000000000000000000"}}}},
            "tokenCount": 1000
        });
        let item = format_portfolio_item(&raw);
        assert_eq!(item.owned_count, 1000);
        assert_eq!(item.total_value, Decimal::MAX);
    }
}
