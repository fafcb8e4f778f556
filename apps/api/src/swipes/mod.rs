//! Swipe log: append-only event inserts plus the derived "most swiped"
//! ranking. Rankings are computed by aggregation over the trailing window on
//! every call, never kept as running counters, so they cannot drift.

use axum::{
    extract::{ConnectInfo, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use std::net::SocketAddr;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::swipe::{MostSwipedEntry, SwipeDirection, SwipeEventRow};
use crate::ratelimit::{client_key, LimitKind};
use crate::state::AppState;

const DEFAULT_WINDOW_DAYS: i64 = 7;
const MAX_WINDOW_DAYS: i64 = 30;
const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 50;

/// Appends one swipe event. No dedupe: a user may swipe the same coin again
/// after a feed reset, and every swipe counts toward tallies.
pub async fn record_swipe(
    db: &PgPool,
    user_id: Uuid,
    coin_mint: &str,
    direction: SwipeDirection,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO swipes (user_id, coin_mint, direction) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(coin_mint)
        .bind(direction.as_str())
        .execute(db)
        .await?;
    Ok(())
}

/// Groups events by mint, counting per direction. Sorted by total count
/// descending, truncated to `limit`.
pub fn tally(events: &[SwipeEventRow], limit: usize) -> Vec<MostSwipedEntry> {
    let mut counts: HashMap<&str, (u64, u64)> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();

    for event in events {
        let entry = counts.entry(event.coin_mint.as_str()).or_insert_with(|| {
            order.push(event.coin_mint.as_str());
            (0, 0)
        });
        if event.direction == "right" {
            entry.0 += 1;
        } else {
            entry.1 += 1;
        }
    }

    // Iterate in first-seen order so the sort below stays stable.
    let mut ranked: Vec<MostSwipedEntry> = order
        .iter()
        .map(|mint| {
            let (right, left) = counts[mint];
            MostSwipedEntry {
                coin_mint: mint.to_string(),
                swipe_count: right + left,
                right_swipes: right,
                left_swipes: left,
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.swipe_count.cmp(&a.swipe_count));
    ranked.truncate(limit);
    ranked
}

/// The ranking over the trailing window: fetch events, aggregate in memory.
pub async fn most_swiped(
    db: &PgPool,
    window_days: i64,
    limit: usize,
) -> Result<Vec<MostSwipedEntry>, sqlx::Error> {
    let cutoff = Utc::now() - Duration::days(window_days);
    let events: Vec<SwipeEventRow> = sqlx::query_as(
        "SELECT user_id, coin_mint, direction, created_at FROM swipes WHERE created_at >= $1",
    )
    .bind(cutoff)
    .fetch_all(db)
    .await?;
    Ok(tally(&events, limit))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwipeRequest {
    pub coin_mint: String,
    pub direction: SwipeDirection,
}

/// POST /api/v1/swipes
pub async fn handle_record_swipe(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<SwipeRequest>,
) -> Result<StatusCode, AppError> {
    state
        .limiter
        .check(&client_key(&headers, peer), "/api/v1/swipes", LimitKind::Mutations)?;
    let user_id = crate::auth::require_user(&headers)?;

    if req.coin_mint.trim().is_empty() {
        return Err(AppError::Validation("'coinMint' is required".to_string()));
    }

    record_swipe(&state.db, user_id, req.coin_mint.trim(), req.direction).await?;
    Ok(StatusCode::CREATED)
}

#[derive(Deserialize)]
pub struct MostSwipedQuery {
    pub limit: Option<usize>,
    pub days: Option<i64>,
}

#[derive(Serialize)]
pub struct MostSwipedResponse {
    pub coins: Vec<MostSwipedEntry>,
    pub period: String,
    pub total: usize,
}

/// GET /api/v1/most-swiped?limit=&days=
pub async fn handle_most_swiped(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(params): Query<MostSwipedQuery>,
) -> Result<Json<MostSwipedResponse>, AppError> {
    state
        .limiter
        .check(&client_key(&headers, peer), "/api/v1/most-swiped", LimitKind::Reads)?;

    let days = params
        .days
        .unwrap_or(DEFAULT_WINDOW_DAYS)
        .clamp(1, MAX_WINDOW_DAYS);
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let coins = most_swiped(&state.db, days, limit).await?;
    let total = coins.len();
    Ok(Json(MostSwipedResponse {
        coins,
        period: format!("{days}d"),
        total,
    }))
}
