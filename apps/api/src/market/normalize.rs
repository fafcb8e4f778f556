//! Upstream JSON normalization.
//!
//! The provider is loose about field names across endpoints, so every target
//! field has one documented priority list of source fields, resolved here and
//! nowhere else. Schema drift stays isolated to this module.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::market::enrich;
use crate::models::coin::{Candle, EnrichedCoin, HolderEntry, HolderInfo};
use crate::themes::{coin_text, Classifier};

/// First non-empty string among the named fields.
fn text(raw: &Value, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .filter_map(|f| raw.get(f).and_then(|v| v.as_str()))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// First numeric value among the named fields. Accepts JSON numbers and
/// numeric strings (the provider mixes both).
fn num(raw: &Value, fields: &[&str]) -> Option<f64> {
    fields.iter().find_map(|f| match raw.get(f) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

/// First epoch timestamp among the named fields. Values above 10^12 are
/// treated as milliseconds, otherwise seconds.
fn epoch(raw: &Value, fields: &[&str]) -> Option<DateTime<Utc>> {
    let n = num(raw, fields)?;
    let secs = if n > 1e12 { n / 1000.0 } else { n };
    Utc.timestamp_opt(secs as i64, 0).single()
}

/// Locates the coin array inside a provider response envelope.
/// Priority: top-level array, then `data`, `tokens`, `results`.
pub fn coin_array(raw: &Value) -> Vec<Value> {
    if let Some(arr) = raw.as_array() {
        return arr.clone();
    }
    for field in ["data", "tokens", "results"] {
        if let Some(arr) = raw.get(field).and_then(|v| v.as_array()) {
            return arr.clone();
        }
    }
    Vec::new()
}

/// Normalizes one raw provider record into an [`EnrichedCoin`], computing all
/// derived fields. Returns `None` for records with no usable mint or a
/// negative price; such records are dropped rather than surfaced.
///
/// Source priority per field:
/// - mint:     `mint` | `address` | `tokenAddress` | `id`
/// - name:     `name` | `tokenName` (falls back to symbol)
/// - symbol:   `symbol` | `ticker`
/// - price:    `priceUsd` | `price` | `usdPrice`
/// - change:   `priceChange24h` | `change24h` | `priceChange24hPercent`
/// - mcap:     `marketCapUsd` | `marketCap` | `mcap` | `fdv`
/// - liq:      `liquidityUsd` | `liquidity`
/// - volume:   `volume24h` | `volume24hUsd` | `v24hUSD`
/// - holders:  `holders` | `holderCount`
/// - txns:     `txns24h` | `txCount24h` | `trades24h`
/// - created:  `createdAt` | `launchTime` | `deployedAt` (epoch s or ms)
pub fn normalize_coin(
    raw: &Value,
    classifier: &dyn Classifier,
    now: DateTime<Utc>,
) -> Option<EnrichedCoin> {
    let mint = text(raw, &["mint", "address", "tokenAddress", "id"])?;
    let symbol = text(raw, &["symbol", "ticker"]).unwrap_or_default();
    let name = text(raw, &["name", "tokenName"]).unwrap_or_else(|| symbol.clone());

    let price_usd = num(raw, &["priceUsd", "price", "usdPrice"]).unwrap_or(0.0);
    if price_usd < 0.0 {
        return None;
    }
    let change_24h_num =
        num(raw, &["priceChange24h", "change24h", "priceChange24hPercent"]).unwrap_or(0.0);
    let market_cap_usd = num(raw, &["marketCapUsd", "marketCap", "mcap", "fdv"]).unwrap_or(0.0);
    let liquidity_usd = num(raw, &["liquidityUsd", "liquidity"]).unwrap_or(0.0);
    let volume_24h = num(raw, &["volume24h", "volume24hUsd", "v24hUSD"]).unwrap_or(0.0);
    let holders = num(raw, &["holders", "holderCount"]).unwrap_or(0.0).max(0.0) as u64;
    let txns_24h = num(raw, &["txns24h", "txCount24h", "trades24h"])
        .unwrap_or(0.0)
        .max(0.0) as u64;
    let created_at = epoch(raw, &["createdAt", "launchTime", "deployedAt"]);

    let description = text(raw, &["description", "desc"]);
    let themes = classifier.detect(&coin_text(&name, &symbol, description.as_deref()));

    Some(EnrichedCoin {
        price: enrich::format_price(price_usd),
        change_24h: enrich::format_change(change_24h_num),
        market_cap: enrich::format_usd(market_cap_usd),
        age: enrich::format_age(created_at, now),
        risk_level: enrich::risk_level(liquidity_usd, volume_24h, created_at, now),
        themes,
        image: text(raw, &["image", "logoURI", "icon"]),
        website: text(raw, &["website", "websiteUrl"]),
        twitter: text(raw, &["twitter", "twitterUrl"]),
        telegram: text(raw, &["telegram", "telegramUrl"]),
        creator: text(raw, &["creator", "deployer"]),
        launchpad: text(raw, &["launchpad", "platform"]),
        mint,
        name,
        symbol,
        description,
        price_usd,
        change_24h_num,
        market_cap_usd,
        liquidity_usd,
        volume_24h,
        holders,
        txns_24h,
        created_at,
    })
}

/// Normalizes one OHLCV bar. `close` is required (`close` | `c` | `price`);
/// open/high/low fall back to close so a chart never breaks on partial bars.
/// Time: `time` | `t` | `timestamp`; volume: `volume` | `v`, default 0.
pub fn normalize_candle(raw: &Value) -> Option<Candle> {
    let time = epoch(raw, &["time", "t", "timestamp"])?.timestamp();
    let close = num(raw, &["close", "c", "price"])?;
    let open = num(raw, &["open", "o"]).unwrap_or(close);
    let high = num(raw, &["high", "h"]).unwrap_or(close);
    let low = num(raw, &["low", "l"]).unwrap_or(close);
    let volume = num(raw, &["volume", "v"]).unwrap_or(0.0);
    Some(Candle {
        time,
        open,
        high,
        low,
        close,
        volume,
    })
}

/// Normalizes the holder endpoint payload. Top-10 concentration is recomputed
/// from the entries when the provider omits it.
pub fn normalize_holders(raw: &Value) -> HolderInfo {
    let entries: Vec<HolderEntry> = coin_array(raw)
        .iter()
        .filter_map(|h| {
            let address = text(h, &["address", "owner", "wallet"])?;
            Some(HolderEntry {
                address,
                amount: num(h, &["amount", "balance", "uiAmount"]).unwrap_or(0.0),
                percentage: num(h, &["percentage", "pct", "share"]).unwrap_or(0.0),
            })
        })
        .collect();

    let total_holders = num(raw, &["totalHolders", "holderCount", "total"])
        .unwrap_or(entries.len() as f64)
        .max(0.0) as u64;
    let top10_concentration = num(raw, &["top10Concentration", "top10Pct"])
        .unwrap_or_else(|| entries.iter().take(10).map(|e| e.percentage).sum());

    HolderInfo {
        total_holders,
        top_holders: entries,
        top10_concentration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::themes::KeywordClassifier;
    use serde_json::json;

    #[test]
    fn test_normalize_coin_field_priority() {
        let raw = json!({
            "address": "So11111111111111111111111111111111111111112",
            "symbol": "WIF",
            "name": "dogwifhat",
            "price": "0.000123",
            "marketCap": 1_500_000.0,
            "liquidity": 250_000.0,
            "volume24h": 90_000.0,
            "holderCount": 4200,
        });
        let coin = normalize_coin(&raw, &KeywordClassifier, Utc::now()).unwrap();
        assert_eq!(coin.mint, "So11111111111111111111111111111111111111112");
        assert_eq!(coin.price_usd, 0.000123);
        assert_eq!(coin.market_cap_usd, 1_500_000.0);
        assert_eq!(coin.holders, 4200);
        assert!(coin.themes.contains(&crate::themes::ThemeId::Dog));
    }

    #[test]
    fn test_normalize_coin_drops_missing_mint() {
        let raw = json!({"symbol": "X", "price": 1.0});
        assert!(normalize_coin(&raw, &KeywordClassifier, Utc::now()).is_none());
    }

    #[test]
    fn test_normalize_coin_drops_negative_price() {
        let raw = json!({"mint": "abc", "price": -1.0});
        assert!(normalize_coin(&raw, &KeywordClassifier, Utc::now()).is_none());
    }

    #[test]
    fn test_normalize_coin_invariants_hold() {
        let raw = json!({"mint": "abc", "symbol": "ABC"});
        let coin = normalize_coin(&raw, &KeywordClassifier, Utc::now()).unwrap();
        assert!(!coin.mint.is_empty());
        assert!(coin.price_usd >= 0.0);
    }

    #[test]
    fn test_normalize_candle_partial_falls_back_to_close() {
        let raw = json!({"t": 1_700_000_000, "c": 2.5, "v": 10.0});
        let candle = normalize_candle(&raw).unwrap();
        assert_eq!(candle.open, 2.5);
        assert_eq!(candle.high, 2.5);
        assert_eq!(candle.low, 2.5);
        assert_eq!(candle.close, 2.5);
        assert_eq!(candle.time, 1_700_000_000);
    }

    #[test]
    fn test_normalize_candle_millis_timestamps() {
        let raw = json!({"time": 1_700_000_000_000_i64, "close": 1.0});
        assert_eq!(normalize_candle(&raw).unwrap().time, 1_700_000_000);
    }

    #[test]
    fn test_normalize_candle_requires_close() {
        let raw = json!({"time": 1_700_000_000, "open": 1.0});
        assert!(normalize_candle(&raw).is_none());
    }

    #[test]
    fn test_normalize_holders_computes_concentration() {
        let raw = json!({
            "totalHolders": 100,
            "data": [
                {"address": "a", "amount": 10.0, "percentage": 40.0},
                {"address": "b", "amount": 5.0, "percentage": 25.0},
            ]
        });
        let info = normalize_holders(&raw);
        assert_eq!(info.total_holders, 100);
        assert_eq!(info.top_holders.len(), 2);
        assert_eq!(info.top10_concentration, 65.0);
    }

    #[test]
    fn test_coin_array_envelopes() {
        assert_eq!(coin_array(&json!([1, 2])).len(), 2);
        assert_eq!(coin_array(&json!({"data": [1]})).len(), 1);
        assert_eq!(coin_array(&json!({"tokens": [1, 2, 3]})).len(), 3);
        assert!(coin_array(&json!({"x": 1})).is_empty());
    }
}
