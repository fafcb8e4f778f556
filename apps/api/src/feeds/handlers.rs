use axum::{
    extract::{ConnectInfo, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::errors::AppError;
use crate::feeds::aggregator::{self, FeedSource};
use crate::feeds::overview::{compute_overview, MarketOverview};
use crate::models::coin::{Candle, EnrichedCoin, HolderInfo, Timeframe};
use crate::ratelimit::{client_key, LimitKind};
use crate::state::AppState;
use crate::themes::{self, ThemeId};

#[derive(Serialize)]
pub struct FeedResponse {
    pub data: Vec<EnrichedCoin>,
    pub source: FeedSource,
    pub timestamp: DateTime<Utc>,
}

/// GET /api/v1/feed/trending
pub async fn handle_trending(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Json<FeedResponse>, AppError> {
    state
        .limiter
        .check(&client_key(&headers, peer), "/api/v1/feed/trending", LimitKind::Reads)?;
    let (data, source) = aggregator::trending_coins(&state).await;
    Ok(Json(FeedResponse {
        data,
        source,
        timestamp: Utc::now(),
    }))
}

/// GET /api/v1/feed/new
pub async fn handle_new(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Json<FeedResponse>, AppError> {
    state
        .limiter
        .check(&client_key(&headers, peer), "/api/v1/feed/new", LimitKind::Reads)?;
    let (data, source) = aggregator::new_coins(&state).await;
    Ok(Json(FeedResponse {
        data,
        source,
        timestamp: Utc::now(),
    }))
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Serialize)]
pub struct ThemeSummary {
    pub id: ThemeId,
    pub name: &'static str,
}

#[derive(Serialize)]
pub struct SearchData {
    pub tokens: Vec<EnrichedCoin>,
    pub themes: Vec<ThemeSummary>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub data: SearchData,
    pub timestamp: DateTime<Utc>,
    pub query: String,
}

/// GET /api/v1/search?q=&type=all|tokens|themes
pub async fn handle_search(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    state
        .limiter
        .check(&client_key(&headers, peer), "/api/v1/search", LimitKind::Reads)?;

    let q = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::Validation("query parameter 'q' is required".to_string()))?
        .to_string();
    let kind = params.kind.as_deref().unwrap_or("all");
    if !matches!(kind, "all" | "tokens" | "themes") {
        return Err(AppError::Validation(
            "'type' must be one of all, tokens, themes".to_string(),
        ));
    }

    let tokens = if kind == "themes" {
        Vec::new()
    } else {
        aggregator::search_coins(&state, &q).await.0
    };
    let themes = if kind == "tokens" {
        Vec::new()
    } else {
        matching_themes(&q)
    };

    Ok(Json(SearchResponse {
        data: SearchData { tokens, themes },
        timestamp: Utc::now(),
        query: q,
    }))
}

/// Themes whose id, display name, or keywords contain the query.
fn matching_themes(query: &str) -> Vec<ThemeSummary> {
    let needle = query.to_lowercase();
    ThemeId::all()
        .iter()
        .copied()
        .filter(|t| {
            t.as_str().contains(&needle)
                || t.display_name().to_lowercase().contains(&needle)
                || t.keywords().iter().any(|kw| kw.contains(&needle))
        })
        .map(|t| ThemeSummary {
            id: t,
            name: t.display_name(),
        })
        .collect()
}

#[derive(Deserialize)]
pub struct ChartQuery {
    pub token: Option<String>,
    pub timeframe: Option<String>,
}

#[derive(Serialize)]
pub struct ChartResponse {
    pub data: Vec<Candle>,
    pub timestamp: DateTime<Utc>,
}

/// GET /api/v1/chart?token=&timeframe=1H|1D|1W|1M|ALL
pub async fn handle_chart(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(params): Query<ChartQuery>,
) -> Result<Json<ChartResponse>, AppError> {
    state
        .limiter
        .check(&client_key(&headers, peer), "/api/v1/chart", LimitKind::Reads)?;

    let token = require_token(params.token.as_deref())?;
    let timeframe = match params.timeframe.as_deref() {
        None => Timeframe::Day,
        Some(tf) => tf.parse::<Timeframe>().map_err(|_| {
            AppError::Validation("'timeframe' must be one of 1H, 1D, 1W, 1M, ALL".to_string())
        })?,
    };

    let key = format!("chart:{}:{}", token, timeframe.as_str());
    let data = match state.cache.get::<Vec<Candle>>(&key).await {
        Some(candles) => candles,
        None => {
            let candles = state.market.fetch_chart(&token, timeframe).await;
            if !candles.is_empty() {
                state.cache.set(&key, &candles, crate::cache::ttl::CHART).await;
            }
            candles
        }
    };

    Ok(Json(ChartResponse {
        data,
        timestamp: Utc::now(),
    }))
}

#[derive(Deserialize)]
pub struct HoldersQuery {
    pub token: Option<String>,
}

#[derive(Serialize)]
pub struct HoldersResponse {
    pub data: HolderInfo,
    pub timestamp: DateTime<Utc>,
}

/// GET /api/v1/holders?token=
pub async fn handle_holders(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(params): Query<HoldersQuery>,
) -> Result<Json<HoldersResponse>, AppError> {
    state
        .limiter
        .check(&client_key(&headers, peer), "/api/v1/holders", LimitKind::Reads)?;

    let token = require_token(params.token.as_deref())?;
    let key = format!("holders:{token}");
    let data = match state.cache.get::<HolderInfo>(&key).await {
        Some(info) => info,
        None => {
            let info = state.market.fetch_holders(&token).await;
            state.cache.set(&key, &info, crate::cache::ttl::HOLDERS).await;
            info
        }
    };

    Ok(Json(HoldersResponse {
        data,
        timestamp: Utc::now(),
    }))
}

fn require_token(token: Option<&str>) -> Result<String, AppError> {
    token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::Validation("query parameter 'token' is required".to_string()))
}

#[derive(Serialize)]
pub struct OverviewResponse {
    pub data: MarketOverview,
}

/// GET /api/v1/market/overview
pub async fn handle_market_overview(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Json<OverviewResponse>, AppError> {
    state.limiter.check(
        &client_key(&headers, peer),
        "/api/v1/market/overview",
        LimitKind::Reads,
    )?;
    let (coins, _) = aggregator::trending_coins(&state).await;
    Ok(Json(OverviewResponse {
        data: compute_overview(&coins, Utc::now()),
    }))
}

#[derive(Deserialize)]
pub struct ThemeQuery {
    pub theme: Option<String>,
}

#[derive(Serialize)]
pub struct ThemedFeedResponse {
    pub data: Vec<EnrichedCoin>,
    pub source: FeedSource,
    pub theme: ThemeId,
    pub timestamp: DateTime<Utc>,
}

/// GET|POST /api/v1/themes/search?theme=
pub async fn handle_theme_search(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(params): Query<ThemeQuery>,
) -> Result<Json<ThemedFeedResponse>, AppError> {
    state
        .limiter
        .check(&client_key(&headers, peer), "/api/v1/themes/search", LimitKind::Reads)?;

    let theme = params
        .theme
        .as_deref()
        .ok_or_else(|| AppError::Validation("query parameter 'theme' is required".to_string()))?
        .parse::<ThemeId>()
        .map_err(|_| AppError::Validation("unknown theme".to_string()))?;

    let (data, source) = aggregator::themed_coins(&state, theme).await;
    Ok(Json(ThemedFeedResponse {
        data,
        source,
        theme,
        timestamp: Utc::now(),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRequest {
    pub mint: String,
    pub theme: String,
}

/// POST /api/v1/themes/tag
///
/// Persists one coin→theme association. Append-if-absent, so retries and
/// concurrent taggers converge.
pub async fn handle_theme_tag(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<TagRequest>,
) -> Result<StatusCode, AppError> {
    state
        .limiter
        .check(&client_key(&headers, peer), "/api/v1/themes/tag", LimitKind::Mutations)?;
    crate::auth::require_user(&headers)?;

    if req.mint.trim().is_empty() {
        return Err(AppError::Validation("'mint' is required".to_string()));
    }
    let theme = req
        .theme
        .parse::<ThemeId>()
        .map_err(|_| AppError::Validation("unknown theme".to_string()))?;

    themes::tag_coin(&state.db, req.mint.trim(), theme).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_themes_by_name_and_keyword() {
        let ids: Vec<ThemeId> = matching_themes("dog").iter().map(|t| t.id).collect();
        assert!(ids.contains(&ThemeId::Dog));

        // "pepe" is a frog keyword, not part of the theme name.
        let ids: Vec<ThemeId> = matching_themes("pepe").iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![ThemeId::Frog]);
    }

    #[test]
    fn test_require_token_rejects_blank() {
        assert!(require_token(None).is_err());
        assert!(require_token(Some("  ")).is_err());
        assert_eq!(require_token(Some(" abc ")).unwrap(), "abc");
    }
}
