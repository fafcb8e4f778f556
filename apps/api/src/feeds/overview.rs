//! Market overview — pure aggregation over the trending set. No side
//! effects, safe to recompute on every call; the trending set itself is
//! cache-backed upstream of this.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;

use crate::models::coin::EnrichedCoin;

const TOP_MOVERS: usize = 3;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewCoin {
    pub mint: String,
    pub symbol: String,
    pub name: String,
    pub price_usd: f64,
    pub change_24h_num: f64,
}

impl From<&EnrichedCoin> for OverviewCoin {
    fn from(c: &EnrichedCoin) -> Self {
        Self {
            mint: c.mint.clone(),
            symbol: c.symbol.clone(),
            name: c.name.clone(),
            price_usd: c.price_usd,
            change_24h_num: c.change_24h_num,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketOverview {
    pub total_market_cap_usd: f64,
    pub average_change_24h: f64,
    pub top_gainers: Vec<OverviewCoin>,
    pub top_losers: Vec<OverviewCoin>,
    pub sample_size: usize,
    pub generated_at: DateTime<Utc>,
}

pub fn compute_overview(coins: &[EnrichedCoin], generated_at: DateTime<Utc>) -> MarketOverview {
    let total_market_cap_usd: f64 = coins.iter().map(|c| c.market_cap_usd).sum();
    let average_change_24h = if coins.is_empty() {
        0.0
    } else {
        coins.iter().map(|c| c.change_24h_num).sum::<f64>() / coins.len() as f64
    };

    let mut by_change: Vec<&EnrichedCoin> = coins.iter().collect();
    by_change.sort_by(|a, b| {
        b.change_24h_num
            .partial_cmp(&a.change_24h_num)
            .unwrap_or(Ordering::Equal)
    });

    let top_gainers = by_change
        .iter()
        .take(TOP_MOVERS)
        .map(|c| OverviewCoin::from(*c))
        .collect();
    let top_losers = by_change
        .iter()
        .rev()
        .take(TOP_MOVERS)
        .map(|c| OverviewCoin::from(*c))
        .collect();

    MarketOverview {
        total_market_cap_usd,
        average_change_24h,
        top_gainers,
        top_losers,
        sample_size: coins.len(),
        generated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::coin::RiskLevel;

    fn coin(mint: &str, market_cap: f64, change: f64) -> EnrichedCoin {
        EnrichedCoin {
            mint: mint.to_string(),
            name: mint.to_uppercase(),
            symbol: mint.to_uppercase(),
            description: None,
            image: None,
            website: None,
            twitter: None,
            telegram: None,
            price_usd: 1.0,
            change_24h_num: change,
            market_cap_usd: market_cap,
            liquidity_usd: 0.0,
            volume_24h: 0.0,
            holders: 0,
            txns_24h: 0,
            price: "$1.00".to_string(),
            change_24h: String::new(),
            market_cap: String::new(),
            age: "--".to_string(),
            themes: Vec::new(),
            created_at: None,
            creator: None,
            launchpad: None,
            risk_level: RiskLevel::Medium,
        }
    }

    #[test]
    fn test_average_is_arithmetic_mean() {
        let coins = vec![coin("a", 100.0, 10.0), coin("b", 200.0, -4.0), coin("c", 50.0, 6.0)];
        let overview = compute_overview(&coins, Utc::now());
        assert!((overview.average_change_24h - 4.0).abs() < 1e-9);
        assert_eq!(overview.total_market_cap_usd, 350.0);
        assert_eq!(overview.sample_size, 3);
    }

    #[test]
    fn test_top_movers_sorted_extremes() {
        let coins = vec![
            coin("a", 0.0, 5.0),
            coin("b", 0.0, -20.0),
            coin("c", 0.0, 30.0),
            coin("d", 0.0, 1.0),
            coin("e", 0.0, -2.0),
        ];
        let overview = compute_overview(&coins, Utc::now());
        let gainers: Vec<&str> = overview.top_gainers.iter().map(|c| c.mint.as_str()).collect();
        let losers: Vec<&str> = overview.top_losers.iter().map(|c| c.mint.as_str()).collect();
        assert_eq!(gainers, vec!["c", "a", "d"]);
        assert_eq!(losers, vec!["b", "e", "d"]);
    }

    #[test]
    fn test_movers_capped_at_three() {
        let coins: Vec<EnrichedCoin> = (0..10)
            .map(|i| coin(&format!("m{i}"), 0.0, i as f64))
            .collect();
        let overview = compute_overview(&coins, Utc::now());
        assert_eq!(overview.top_gainers.len(), 3);
        assert_eq!(overview.top_losers.len(), 3);
    }

    #[test]
    fn test_empty_set_is_zeroed() {
        let overview = compute_overview(&[], Utc::now());
        assert_eq!(overview.sample_size, 0);
        assert_eq!(overview.average_change_24h, 0.0);
        assert!(overview.top_gainers.is_empty());
    }
}
