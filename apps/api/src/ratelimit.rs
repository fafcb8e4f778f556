//! Sliding-window request throttle, keyed by client address + route path so
//! limits are per-client-per-endpoint.
//!
//! Fail-open by policy: when disabled via config, or when the window state is
//! unavailable (poisoned lock), every request is allowed. Availability wins
//! over strict enforcement when the limiter itself is degraded.

use axum::http::HeaderMap;
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::errors::AppError;

/// Which budget a route draws from. Mutations are throttled tighter than
/// reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    Mutations,
    Reads,
}

impl LimitKind {
    pub fn limit(&self) -> u32 {
        match self {
            LimitKind::Mutations => 10,
            LimitKind::Reads => 30,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(10)
    }
}

pub struct RateLimiter {
    enabled: bool,
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Checks one request against its budget. `Ok(())` means proceed; the
    /// error carries the limit and the seconds until the window frees up.
    pub fn check(&self, client: &str, path: &str, kind: LimitKind) -> Result<(), AppError> {
        self.check_at(client, path, kind, Instant::now())
    }

    fn check_at(
        &self,
        client: &str,
        path: &str,
        kind: LimitKind,
        now: Instant,
    ) -> Result<(), AppError> {
        if !self.enabled {
            return Ok(());
        }

        let mut windows = match self.windows.lock() {
            Ok(w) => w,
            // Fail open: a degraded limiter never blocks traffic.
            Err(_) => return Ok(()),
        };

        let key = format!("{client}:{path}");
        let window = windows.entry(key).or_default();
        let horizon = now.checked_sub(kind.window()).unwrap_or(now);

        while window.front().map(|t| *t <= horizon).unwrap_or(false) {
            window.pop_front();
        }

        if window.len() >= kind.limit() as usize {
            let reset_secs = window
                .front()
                .map(|oldest| {
                    kind.window()
                        .saturating_sub(now.duration_since(*oldest))
                        .as_secs()
                        .max(1)
                })
                .unwrap_or(1);
            return Err(AppError::RateLimited {
                limit: kind.limit(),
                reset_secs,
            });
        }

        window.push_back(now);
        Ok(())
    }
}

/// Client key for limiting: forwarded address when behind a proxy, else the
/// peer address of the connection, so direct clients get separate buckets.
pub fn client_key(headers: &HeaderMap, peer: SocketAddr) -> String {
    for header in ["x-forwarded-for", "x-real-ip"] {
        if let Some(value) = headers.get(header).and_then(|v| v.to_str().ok()) {
            if let Some(first) = value.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return first.to_string();
                }
            }
        }
    }
    peer.ip().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_limited(result: Result<(), AppError>) {
        match result {
            Err(AppError::RateLimited { limit, .. }) => assert!(limit > 0),
            other => panic!("expected rate limit rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_requests_under_limit_allowed() {
        let limiter = RateLimiter::new(true);
        let now = Instant::now();
        for _ in 0..LimitKind::Mutations.limit() {
            limiter
                .check_at("1.2.3.4", "/api/v1/swipes", LimitKind::Mutations, now)
                .unwrap();
        }
    }

    #[test]
    fn test_request_over_limit_rejected() {
        let limiter = RateLimiter::new(true);
        let now = Instant::now();
        for _ in 0..LimitKind::Mutations.limit() {
            limiter
                .check_at("1.2.3.4", "/api/v1/swipes", LimitKind::Mutations, now)
                .unwrap();
        }
        assert_limited(limiter.check_at("1.2.3.4", "/api/v1/swipes", LimitKind::Mutations, now));
    }

    #[test]
    fn test_window_slides() {
        let limiter = RateLimiter::new(true);
        let start = Instant::now();
        for _ in 0..LimitKind::Mutations.limit() {
            limiter
                .check_at("1.2.3.4", "/api/v1/swipes", LimitKind::Mutations, start)
                .unwrap();
        }
        let later = start + LimitKind::Mutations.window() + Duration::from_secs(1);
        limiter
            .check_at("1.2.3.4", "/api/v1/swipes", LimitKind::Mutations, later)
            .unwrap();
    }

    #[test]
    fn test_limits_are_per_client_and_route() {
        let limiter = RateLimiter::new(true);
        let now = Instant::now();
        for _ in 0..LimitKind::Mutations.limit() {
            limiter
                .check_at("1.2.3.4", "/api/v1/swipes", LimitKind::Mutations, now)
                .unwrap();
        }
        // Different client, same route; same client, different route.
        limiter
            .check_at("5.6.7.8", "/api/v1/swipes", LimitKind::Mutations, now)
            .unwrap();
        limiter
            .check_at("1.2.3.4", "/api/v1/favorites", LimitKind::Mutations, now)
            .unwrap();
    }

    #[test]
    fn test_disabled_limiter_always_allows() {
        let limiter = RateLimiter::new(false);
        let now = Instant::now();
        for _ in 0..100 {
            limiter
                .check_at("1.2.3.4", "/api/v1/swipes", LimitKind::Mutations, now)
                .unwrap();
        }
    }

    #[test]
    fn test_reads_budget_is_looser() {
        let limiter = RateLimiter::new(true);
        let now = Instant::now();
        for _ in 0..LimitKind::Reads.limit() {
            limiter
                .check_at("1.2.3.4", "/api/v1/feed/trending", LimitKind::Reads, now)
                .unwrap();
        }
        assert_limited(limiter.check_at(
            "1.2.3.4",
            "/api/v1/feed/trending",
            LimitKind::Reads,
            now,
        ));
        assert!(LimitKind::Reads.limit() > LimitKind::Mutations.limit());
    }

    #[test]
    fn test_client_key_prefers_forwarded_for() {
        let peer: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "9.9.9.9, 10.0.0.1".parse().unwrap());
        assert_eq!(client_key(&headers, peer), "9.9.9.9");
    }

    #[test]
    fn test_direct_clients_get_separate_buckets() {
        let peer_a: SocketAddr = "10.0.0.5:50000".parse().unwrap();
        let peer_b: SocketAddr = "10.0.0.6:50000".parse().unwrap();
        let key_a = client_key(&HeaderMap::new(), peer_a);
        let key_b = client_key(&HeaderMap::new(), peer_b);
        assert_ne!(key_a, key_b);

        // Exhausting A's read budget must not reject B on the same route.
        let limiter = RateLimiter::new(true);
        let now = Instant::now();
        for _ in 0..LimitKind::Reads.limit() {
            limiter
                .check_at(&key_a, "/api/v1/feed/trending", LimitKind::Reads, now)
                .unwrap();
        }
        assert_limited(limiter.check_at(&key_a, "/api/v1/feed/trending", LimitKind::Reads, now));
        limiter
            .check_at(&key_b, "/api/v1/feed/trending", LimitKind::Reads, now)
            .unwrap();
    }
}
