//! Upstream market-data client — the single point of entry for all provider
//! HTTP calls.
//!
//! ARCHITECTURAL RULE: no other module may call the market provider directly.
//!
//! Failure semantics: any network error, non-2xx status, timeout, or
//! malformed payload is caught here and converted to an empty result plus a
//! logged diagnostic. The client never propagates an error past its boundary,
//! so one degraded upstream call cannot fail an entire feed render.

use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

pub mod enrich;
pub mod normalize;

use crate::models::coin::{Candle, EnrichedCoin, HolderInfo, Timeframe};
use crate::themes::Classifier;

const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

#[derive(Debug, Error)]
enum MarketError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned status {status}")]
    Status { status: u16 },
}

/// Thin reqwest wrapper around the token-data provider.
#[derive(Clone)]
pub struct MarketClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl MarketClient {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            http: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, MarketError> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.get(&url).query(query);
        if let Some(key) = &self.api_key {
            req = req.header("x-api-key", key);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MarketError::Status {
                status: status.as_u16(),
            });
        }

        let body: Value = response.json().await?;
        debug!("provider GET {path} ok");
        Ok(body)
    }

    /// Fetches a coin-list endpoint and normalizes every usable record.
    /// Degrades to an empty list on any failure.
    async fn fetch_coins(
        &self,
        path: &str,
        query: &[(&str, String)],
        classifier: &dyn Classifier,
    ) -> Vec<EnrichedCoin> {
        match self.get_json(path, query).await {
            Ok(body) => {
                let now = Utc::now();
                normalize::coin_array(&body)
                    .iter()
                    .filter_map(|raw| normalize::normalize_coin(raw, classifier, now))
                    .collect()
            }
            Err(e) => {
                warn!("provider call {path} failed: {e}");
                Vec::new()
            }
        }
    }

    /// Trending tokens by recent volume.
    pub async fn fetch_trending(&self, classifier: &dyn Classifier) -> Vec<EnrichedCoin> {
        self.fetch_coins("/tokens/trending", &[], classifier).await
    }

    /// Recently launched tokens.
    pub async fn fetch_new(&self, classifier: &dyn Classifier) -> Vec<EnrichedCoin> {
        self.fetch_coins("/tokens/new", &[], classifier).await
    }

    /// Free-text token search. Tolerates provider error: logs and returns
    /// empty rather than failing the search page.
    pub async fn search(&self, query: &str, classifier: &dyn Classifier) -> Vec<EnrichedCoin> {
        self.fetch_coins("/search", &[("q", query.to_string())], classifier)
            .await
    }

    /// OHLCV candles for one mint at the timeframe's interval. Partial bars
    /// are repaired during normalization; failures degrade to an empty chart.
    pub async fn fetch_chart(&self, mint: &str, timeframe: Timeframe) -> Vec<Candle> {
        let path = format!("/tokens/{mint}/chart");
        match self
            .get_json(&path, &[("interval", timeframe.interval().to_string())])
            .await
        {
            Ok(body) => normalize::coin_array(&body)
                .iter()
                .filter_map(normalize::normalize_candle)
                .collect(),
            Err(e) => {
                warn!("chart fetch for {mint} failed: {e}");
                Vec::new()
            }
        }
    }

    /// Holder list and concentration stats for one mint. Degrades to an
    /// empty report on failure.
    pub async fn fetch_holders(&self, mint: &str) -> HolderInfo {
        let path = format!("/tokens/{mint}/holders");
        match self.get_json(&path, &[]).await {
            Ok(body) => normalize::normalize_holders(&body),
            Err(e) => {
                warn!("holder fetch for {mint} failed: {e}");
                HolderInfo::default()
            }
        }
    }
}
