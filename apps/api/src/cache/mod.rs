//! Two-layer cache service: optional shared Redis in front of a process-local
//! map.
//!
//! Reads prefer Redis (survives restarts, shared across instances), fall back
//! to the local map, and report a miss otherwise. Writes go through both
//! layers. The whole service is best-effort: every backend failure is logged
//! and treated as a miss (read) or no-op (write), so callers degrade to a
//! direct upstream fetch instead of failing.
//!
//! Constructed once per process and injected via `AppState`; tests build a
//! fresh local-only instance for isolation.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// TTLs per feed. Shorter for more volatile, higher-cardinality data.
pub mod ttl {
    use std::time::Duration;

    pub const TRENDING: Duration = Duration::from_secs(30 * 60);
    pub const NEW_LISTINGS: Duration = Duration::from_secs(3 * 60);
    pub const SEARCH: Duration = Duration::from_secs(5 * 60);
    pub const THEME_FEED: Duration = Duration::from_secs(10 * 60);
    pub const CHART: Duration = Duration::from_secs(60);
    pub const HOLDERS: Duration = Duration::from_secs(5 * 60);
}

struct LocalEntry {
    payload: String,
    stored_at: Instant,
    ttl: Duration,
}

impl LocalEntry {
    fn expired(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at) > self.ttl
    }
}

pub struct CacheService {
    local: RwLock<HashMap<String, LocalEntry>>,
    redis: Option<ConnectionManager>,
}

impl CacheService {
    /// Local-only cache, used when Redis is unconfigured and in tests.
    pub fn local_only() -> Self {
        Self {
            local: RwLock::new(HashMap::new()),
            redis: None,
        }
    }

    /// Connects the distributed layer when a URL is configured. Connection
    /// failure degrades to local-only with a warning rather than failing
    /// startup.
    pub async fn connect(redis_url: Option<&str>) -> Self {
        let redis = match redis_url {
            Some(url) => match redis::Client::open(url) {
                Ok(client) => match ConnectionManager::new(client).await {
                    Ok(conn) => {
                        info!("Redis cache layer connected");
                        Some(conn)
                    }
                    Err(e) => {
                        warn!("Redis unavailable, caching locally only: {e}");
                        None
                    }
                },
                Err(e) => {
                    warn!("Invalid Redis URL, caching locally only: {e}");
                    None
                }
            },
            None => None,
        };

        Self {
            local: RwLock::new(HashMap::new()),
            redis,
        }
    }

    /// Reads a cached value: Redis first, then the local map. Expired local
    /// entries are evicted on access (lazy expiry, no background sweep).
    /// Any backend error is a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if let Some(conn) = &self.redis {
            let mut conn = conn.clone();
            match conn.get::<_, Option<String>>(key).await {
                Ok(Some(json)) => match serde_json::from_str(&json) {
                    Ok(value) => return Some(value),
                    Err(e) => warn!("cache entry {key} failed to deserialize: {e}"),
                },
                Ok(None) => {}
                Err(e) => warn!("Redis read for {key} failed: {e}"),
            }
        }

        self.get_local(key, Instant::now())
    }

    fn get_local<T: DeserializeOwned>(&self, key: &str, now: Instant) -> Option<T> {
        {
            let map = self.local.read().ok()?;
            match map.get(key) {
                Some(entry) if !entry.expired(now) => {
                    return serde_json::from_str(&entry.payload).ok();
                }
                Some(_) => {}
                None => return None,
            }
        }
        // Expired: evict under the write lock, then report a miss.
        if let Ok(mut map) = self.local.write() {
            if map.get(key).map(|e| e.expired(now)).unwrap_or(false) {
                map.remove(key);
            }
        }
        None
    }

    /// Writes through both layers: Redis first (cross-instance benefit), then
    /// the local map as a fast path. Failures are logged, never surfaced.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                warn!("cache serialize for {key} failed: {e}");
                return;
            }
        };

        if let Some(conn) = &self.redis {
            let mut conn = conn.clone();
            if let Err(e) = conn
                .set_ex::<_, _, ()>(key, json.clone(), ttl.as_secs())
                .await
            {
                warn!("Redis write for {key} failed: {e}");
            }
        }

        if let Ok(mut map) = self.local.write() {
            map.insert(
                key.to_string(),
                LocalEntry {
                    payload: json,
                    stored_at: Instant::now(),
                    ttl,
                },
            );
        }
    }

    /// Removes one entry (both layers) or flushes the whole local map.
    pub async fn clear(&self, key: Option<&str>) {
        match key {
            Some(key) => {
                if let Some(conn) = &self.redis {
                    let mut conn = conn.clone();
                    if let Err(e) = conn.del::<_, ()>(key).await {
                        warn!("Redis delete for {key} failed: {e}");
                    }
                }
                if let Ok(mut map) = self.local.write() {
                    map.remove(key);
                }
            }
            None => {
                if let Ok(mut map) = self.local.write() {
                    map.clear();
                }
            }
        }
    }
}
