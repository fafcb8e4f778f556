use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

use crate::themes::ThemeId;

/// Derived risk classification, recomputed from liquidity/volume/age on every fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// The canonical coin representation flowing through feeds, cache, and responses.
///
/// Constructed whole on every upstream fetch (or deserialized whole from cache);
/// never field-merged across fetches, so numeric and display fields always share
/// one enrichment timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedCoin {
    /// Chain address. Unique identity across all feeds.
    pub mint: String,
    pub name: String,
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram: Option<String>,

    // Market snapshot, last-write-wins.
    pub price_usd: f64,
    pub change_24h_num: f64,
    pub market_cap_usd: f64,
    pub liquidity_usd: f64,
    pub volume_24h: f64,
    pub holders: u64,
    pub txns_24h: u64,

    // Display strings derived from the numeric snapshot at enrichment time.
    pub price: String,
    pub change_24h: String,
    pub market_cap: String,
    pub age: String,

    pub themes: Vec<ThemeId>,

    // Provenance, immutable once set upstream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launchpad: Option<String>,

    pub risk_level: RiskLevel,
}

/// One OHLCV bar. `time` is a unix timestamp in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolderEntry {
    pub address: String,
    pub amount: f64,
    pub percentage: f64,
}

/// Holder list plus concentration stats for one mint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolderInfo {
    pub total_holders: u64,
    pub top_holders: Vec<HolderEntry>,
    /// Combined share of supply held by the top ten holders, in percent.
    pub top10_concentration: f64,
}

/// Chart lookback window accepted by the chart endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeframe {
    Hour,
    Day,
    Week,
    Month,
    All,
}

impl Timeframe {
    /// Candle interval parameter understood by the upstream provider.
    pub fn interval(&self) -> &'static str {
        match self {
            Timeframe::Hour => "1m",
            Timeframe::Day => "15m",
            Timeframe::Week => "1h",
            Timeframe::Month => "4h",
            Timeframe::All => "1d",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Hour => "1H",
            Timeframe::Day => "1D",
            Timeframe::Week => "1W",
            Timeframe::Month => "1M",
            Timeframe::All => "ALL",
        }
    }
}

impl FromStr for Timeframe {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "1H" => Ok(Timeframe::Hour),
            "1D" => Ok(Timeframe::Day),
            "1W" => Ok(Timeframe::Week),
            "1M" => Ok(Timeframe::Month),
            "ALL" => Ok(Timeframe::All),
            _ => Err(()),
        }
    }
}

/// Removes duplicate mints, keeping the first occurrence of each. Order is
/// otherwise preserved, which is what makes the themed-feed sort stable
/// against the original fetch order.
pub fn dedupe_by_mint(coins: Vec<EnrichedCoin>) -> Vec<EnrichedCoin> {
    let mut seen: HashSet<String> = HashSet::with_capacity(coins.len());
    coins
        .into_iter()
        .filter(|c| seen.insert(c.mint.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin(mint: &str, market_cap: f64) -> EnrichedCoin {
        EnrichedCoin {
            mint: mint.to_string(),
            name: mint.to_uppercase(),
            symbol: mint.to_uppercase(),
            description: None,
            image: None,
            website: None,
            twitter: None,
            telegram: None,
            price_usd: 0.0,
            change_24h_num: 0.0,
            market_cap_usd: market_cap,
            liquidity_usd: 0.0,
            volume_24h: 0.0,
            holders: 0,
            txns_24h: 0,
            price: "$0.00".to_string(),
            change_24h: "+0.00%".to_string(),
            market_cap: "$0".to_string(),
            age: "--".to_string(),
            themes: Vec::new(),
            created_at: None,
            creator: None,
            launchpad: None,
            risk_level: RiskLevel::Medium,
        }
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let merged = dedupe_by_mint(vec![coin("a", 1.0), coin("b", 2.0), coin("a", 3.0)]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].mint, "a");
        assert_eq!(merged[0].market_cap_usd, 1.0);
        assert_eq!(merged[1].mint, "b");
    }

    #[test]
    fn test_dedupe_no_shared_mints() {
        let merged = dedupe_by_mint(vec![
            coin("a", 1.0),
            coin("a", 1.0),
            coin("b", 1.0),
            coin("b", 1.0),
        ]);
        let mut mints: Vec<&str> = merged.iter().map(|c| c.mint.as_str()).collect();
        mints.sort();
        mints.dedup();
        assert_eq!(mints.len(), merged.len());
    }

    #[test]
    fn test_timeframe_parsing() {
        assert_eq!("1h".parse::<Timeframe>(), Ok(Timeframe::Hour));
        assert_eq!("ALL".parse::<Timeframe>(), Ok(Timeframe::All));
        assert!("2H".parse::<Timeframe>().is_err());
    }
}
