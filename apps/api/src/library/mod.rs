//! Library persistence: favorites, matches, and folders. Thin keyed CRUD on
//! top of Postgres; every mutation requires an authenticated user and draws
//! from the mutations rate budget.
//!
//! Duplicate inserts surface as 409 and are informational, not failures:
//! retrying an add is idempotent from the caller's perspective.

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use sqlx::PgPool;
use std::net::SocketAddr;
use uuid::Uuid;

use crate::auth::require_user;
use crate::errors::{is_unique_violation, AppError};
use crate::models::swipe::{FolderRow, SavedCoinRow};
use crate::ratelimit::{client_key, LimitKind};
use crate::state::AppState;

/// Favorites and matches share one contract: a unique (user, coin) set.
#[derive(Debug, Clone, Copy)]
enum SavedKind {
    Favorites,
    Matches,
}

impl SavedKind {
    fn noun(&self) -> &'static str {
        match self {
            SavedKind::Favorites => "favorite",
            SavedKind::Matches => "match",
        }
    }

    fn insert_sql(&self) -> &'static str {
        match self {
            SavedKind::Favorites => {
                "INSERT INTO favorites (user_id, coin_mint) VALUES ($1, $2)"
            }
            SavedKind::Matches => "INSERT INTO matches (user_id, coin_mint) VALUES ($1, $2)",
        }
    }

    fn delete_sql(&self) -> &'static str {
        match self {
            SavedKind::Favorites => {
                "DELETE FROM favorites WHERE user_id = $1 AND coin_mint = $2"
            }
            SavedKind::Matches => "DELETE FROM matches WHERE user_id = $1 AND coin_mint = $2",
        }
    }

    fn list_sql(&self) -> &'static str {
        match self {
            SavedKind::Favorites => {
                "SELECT coin_mint, created_at FROM favorites WHERE user_id = $1 ORDER BY created_at DESC"
            }
            SavedKind::Matches => {
                "SELECT coin_mint, created_at FROM matches WHERE user_id = $1 ORDER BY created_at DESC"
            }
        }
    }
}

async fn add_saved(
    db: &PgPool,
    kind: SavedKind,
    user_id: Uuid,
    mint: &str,
) -> Result<(), AppError> {
    sqlx::query(kind.insert_sql())
        .bind(user_id)
        .bind(mint)
        .execute(db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("{} already exists for this coin", kind.noun()))
            } else {
                AppError::Database(e)
            }
        })?;
    Ok(())
}

async fn remove_saved(
    db: &PgPool,
    kind: SavedKind,
    user_id: Uuid,
    mint: &str,
) -> Result<(), AppError> {
    let result = sqlx::query(kind.delete_sql())
        .bind(user_id)
        .bind(mint)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "no {} for coin {mint}",
            kind.noun()
        )));
    }
    Ok(())
}

async fn list_saved(
    db: &PgPool,
    kind: SavedKind,
    user_id: Uuid,
) -> Result<Vec<SavedCoinRow>, AppError> {
    let rows = sqlx::query_as(kind.list_sql())
        .bind(user_id)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedCoinRequest {
    pub coin_mint: String,
}

fn valid_mint(mint: &str) -> Result<&str, AppError> {
    let mint = mint.trim();
    if mint.is_empty() {
        return Err(AppError::Validation("'coinMint' is required".to_string()));
    }
    Ok(mint)
}

// ────────────────────────────────────────────────────────────────────────────
// Favorites
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/favorites
pub async fn handle_add_favorite(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<SavedCoinRequest>,
) -> Result<StatusCode, AppError> {
    state
        .limiter
        .check(&client_key(&headers, peer), "/api/v1/favorites", LimitKind::Mutations)?;
    let user_id = require_user(&headers)?;
    add_saved(&state.db, SavedKind::Favorites, user_id, valid_mint(&req.coin_mint)?).await?;
    Ok(StatusCode::CREATED)
}

/// GET /api/v1/favorites
pub async fn handle_list_favorites(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Json<Vec<SavedCoinRow>>, AppError> {
    state
        .limiter
        .check(&client_key(&headers, peer), "/api/v1/favorites", LimitKind::Reads)?;
    let user_id = require_user(&headers)?;
    Ok(Json(list_saved(&state.db, SavedKind::Favorites, user_id).await?))
}

/// DELETE /api/v1/favorites/:mint
pub async fn handle_remove_favorite(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(mint): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .limiter
        .check(&client_key(&headers, peer), "/api/v1/favorites", LimitKind::Mutations)?;
    let user_id = require_user(&headers)?;
    remove_saved(&state.db, SavedKind::Favorites, user_id, valid_mint(&mint)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ────────────────────────────────────────────────────────────────────────────
// Matches
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/matches
pub async fn handle_add_match(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<SavedCoinRequest>,
) -> Result<StatusCode, AppError> {
    state
        .limiter
        .check(&client_key(&headers, peer), "/api/v1/matches", LimitKind::Mutations)?;
    let user_id = require_user(&headers)?;
    add_saved(&state.db, SavedKind::Matches, user_id, valid_mint(&req.coin_mint)?).await?;
    Ok(StatusCode::CREATED)
}

/// GET /api/v1/matches
pub async fn handle_list_matches(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Json<Vec<SavedCoinRow>>, AppError> {
    state
        .limiter
        .check(&client_key(&headers, peer), "/api/v1/matches", LimitKind::Reads)?;
    let user_id = require_user(&headers)?;
    Ok(Json(list_saved(&state.db, SavedKind::Matches, user_id).await?))
}

/// DELETE /api/v1/matches/:mint
pub async fn handle_remove_match(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(mint): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .limiter
        .check(&client_key(&headers, peer), "/api/v1/matches", LimitKind::Mutations)?;
    let user_id = require_user(&headers)?;
    remove_saved(&state.db, SavedKind::Matches, user_id, valid_mint(&mint)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ────────────────────────────────────────────────────────────────────────────
// Folders
// ────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateFolderRequest {
    pub name: String,
}

/// POST /api/v1/folders
pub async fn handle_create_folder(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<CreateFolderRequest>,
) -> Result<(StatusCode, Json<FolderRow>), AppError> {
    state
        .limiter
        .check(&client_key(&headers, peer), "/api/v1/folders", LimitKind::Mutations)?;
    let user_id = require_user(&headers)?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("'name' is required".to_string()));
    }

    let folder: FolderRow = sqlx::query_as(
        "INSERT INTO folders (user_id, name) VALUES ($1, $2) RETURNING id, name, created_at",
    )
    .bind(user_id)
    .bind(name)
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("folder '{name}' already exists"))
        } else {
            AppError::Database(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(folder)))
}

/// GET /api/v1/folders
pub async fn handle_list_folders(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Json<Vec<FolderRow>>, AppError> {
    state
        .limiter
        .check(&client_key(&headers, peer), "/api/v1/folders", LimitKind::Reads)?;
    let user_id = require_user(&headers)?;

    let folders: Vec<FolderRow> = sqlx::query_as(
        "SELECT id, name, created_at FROM folders WHERE user_id = $1 ORDER BY created_at",
    )
    .bind(user_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(folders))
}

/// DELETE /api/v1/folders/:id
pub async fn handle_delete_folder(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .limiter
        .check(&client_key(&headers, peer), "/api/v1/folders", LimitKind::Mutations)?;
    let user_id = require_user(&headers)?;

    let result = sqlx::query("DELETE FROM folders WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("folder {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Verifies the folder exists and belongs to the caller.
async fn require_folder(db: &PgPool, id: Uuid, user_id: Uuid) -> Result<(), AppError> {
    let exists: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM folders WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(db)
            .await?;
    exists
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound(format!("folder {id} not found")))
}

/// POST /api/v1/folders/:id/coins
///
/// Append-if-absent: adding a coin already in the folder is a no-op success.
pub async fn handle_add_folder_coin(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<SavedCoinRequest>,
) -> Result<StatusCode, AppError> {
    state
        .limiter
        .check(&client_key(&headers, peer), "/api/v1/folders/coins", LimitKind::Mutations)?;
    let user_id = require_user(&headers)?;
    let mint = valid_mint(&req.coin_mint)?;

    require_folder(&state.db, id, user_id).await?;
    sqlx::query(
        "INSERT INTO folder_coins (folder_id, coin_mint) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(id)
    .bind(mint)
    .execute(&state.db)
    .await?;
    Ok(StatusCode::CREATED)
}

/// DELETE /api/v1/folders/:id/coins/:mint
pub async fn handle_remove_folder_coin(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path((id, mint)): Path<(Uuid, String)>,
) -> Result<StatusCode, AppError> {
    state
        .limiter
        .check(&client_key(&headers, peer), "/api/v1/folders/coins", LimitKind::Mutations)?;
    let user_id = require_user(&headers)?;

    require_folder(&state.db, id, user_id).await?;
    let result = sqlx::query("DELETE FROM folder_coins WHERE folder_id = $1 AND coin_mint = $2")
        .bind(id)
        .bind(&mint)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "coin {mint} is not in folder {id}"
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}
