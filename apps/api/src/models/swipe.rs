use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Swipe direction. Right saves the coin, left passes on it; both count
/// toward "most swiped" rankings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDirection {
    Left,
    Right,
}

impl SwipeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwipeDirection::Left => "left",
            SwipeDirection::Right => "right",
        }
    }
}

/// One append-only swipe event. Never updated or deleted.
#[derive(Debug, Clone, FromRow)]
pub struct SwipeEventRow {
    pub user_id: Uuid,
    pub coin_mint: String,
    pub direction: String,
    pub created_at: DateTime<Utc>,
}

/// One entry in the most-swiped ranking, derived by aggregation over the
/// event log, never stored as a running counter.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MostSwipedEntry {
    pub coin_mint: String,
    pub swipe_count: u64,
    pub right_swipes: u64,
    pub left_swipes: u64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedCoinRow {
    pub coin_mint: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderRow {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
