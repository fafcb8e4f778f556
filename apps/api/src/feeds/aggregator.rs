//! Feed orchestration: cache check → upstream fetch → classify/tag → cache
//! write, strictly sequential within one request.
//!
//! Concurrent cold-cache requests for the same key may each fetch upstream
//! and redundantly write it; that is accepted because cache writes are
//! idempotent overwrites. Empty upstream results are returned as-is but
//! never written to cache, so a still-valid earlier payload keeps serving.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::future::Future;
use std::time::Duration;

use crate::cache::{ttl, CacheService};
use crate::models::coin::{dedupe_by_mint, EnrichedCoin};
use crate::state::AppState;
use crate::themes::{self, ThemeId};

/// Where a feed payload came from, reported to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSource {
    Cache,
    Upstream,
}

pub const TRENDING_KEY: &str = "feed:trending";
pub const NEW_KEY: &str = "feed:new";

pub fn theme_key(theme: ThemeId) -> String {
    format!("feed:theme:{}", theme.as_str())
}

pub fn search_key(query: &str) -> String {
    format!("search:{}", query.to_lowercase())
}

/// Serve `key` from cache, or run `fetch` and write the result through.
/// An empty fetch result is passed to the caller but never cached.
async fn cache_or_fetch<F, Fut>(
    cache: &CacheService,
    key: &str,
    ttl: Duration,
    fetch: F,
) -> (Vec<EnrichedCoin>, FeedSource)
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Vec<EnrichedCoin>>,
{
    if let Some(coins) = cache.get::<Vec<EnrichedCoin>>(key).await {
        return (coins, FeedSource::Cache);
    }

    let coins = fetch().await;
    if !coins.is_empty() {
        cache.set(key, &coins, ttl).await;
    }
    (coins, FeedSource::Upstream)
}

/// Trending coins, cache-or-fetch. On a fresh upstream fetch the classifier
/// output is mirrored to the database before the payload is cached.
pub async fn trending_coins(state: &AppState) -> (Vec<EnrichedCoin>, FeedSource) {
    cache_or_fetch(&state.cache, TRENDING_KEY, ttl::TRENDING, || async {
        let coins = state.market.fetch_trending(state.classifier.as_ref()).await;
        themes::auto_tag_famous_coins(&state.db, &coins).await;
        coins
    })
    .await
}

/// Recently launched coins. Same shape as trending with a shorter TTL,
/// since new listings move faster.
pub async fn new_coins(state: &AppState) -> (Vec<EnrichedCoin>, FeedSource) {
    cache_or_fetch(&state.cache, NEW_KEY, ttl::NEW_LISTINGS, || async {
        state.market.fetch_new(state.classifier.as_ref()).await
    })
    .await
}

/// Free-text search, cached per normalized query.
pub async fn search_coins(state: &AppState, query: &str) -> (Vec<EnrichedCoin>, FeedSource) {
    let key = search_key(query);
    cache_or_fetch(&state.cache, &key, ttl::SEARCH, || async {
        state.market.search(query, state.classifier.as_ref()).await
    })
    .await
}

/// Themed feed over the trending candidate pool.
///
/// A coin qualifies when the classifier tagged it with the theme, or its mint
/// is in the theme's curated registry. The result is deduped by mint and
/// sorted by market cap descending (stable sort, so ties keep fetch order).
/// An empty result substitutes the curated fallback list, which keeps the
/// feed non-empty as long as that list is. The substituted list is never
/// cached, so a later pool that does match is picked up immediately.
pub async fn themed_coins(state: &AppState, theme: ThemeId) -> (Vec<EnrichedCoin>, FeedSource) {
    let key = theme_key(theme);
    if let Some(coins) = state.cache.get::<Vec<EnrichedCoin>>(&key).await {
        return (coins, FeedSource::Cache);
    }

    let (pool, _) = trending_coins(state).await;
    themed_from_pool(&state.cache, theme, pool).await
}

/// Filters `pool` for `theme` and caches the result, unless the curated
/// fallback list had to stand in for an empty match.
async fn themed_from_pool(
    cache: &CacheService,
    theme: ThemeId,
    pool: Vec<EnrichedCoin>,
) -> (Vec<EnrichedCoin>, FeedSource) {
    let (coins, fell_back) = filter_themed(pool, theme);
    if !fell_back && !coins.is_empty() {
        cache.set(&theme_key(theme), &coins, ttl::THEME_FEED).await;
    }
    (coins, FeedSource::Upstream)
}

/// Returns the themed slice of `pool` and whether the curated fallback list
/// was substituted because nothing in the pool matched.
fn filter_themed(pool: Vec<EnrichedCoin>, theme: ThemeId) -> (Vec<EnrichedCoin>, bool) {
    let curated = themes::fallback_mints(theme);
    let matched: Vec<EnrichedCoin> = pool
        .into_iter()
        .filter(|c| c.themes.contains(&theme) || curated.contains(&c.mint.as_str()))
        .collect();

    let mut matched = dedupe_by_mint(matched);
    matched.sort_by(|a, b| {
        b.market_cap_usd
            .partial_cmp(&a.market_cap_usd)
            .unwrap_or(Ordering::Equal)
    });

    if matched.is_empty() {
        (themes::fallback_coins(theme), true)
    } else {
        (matched, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::coin::RiskLevel;

    fn coin(mint: &str, market_cap: f64, themes: Vec<ThemeId>) -> EnrichedCoin {
        EnrichedCoin {
            mint: mint.to_string(),
            name: mint.to_uppercase(),
            symbol: mint.to_uppercase(),
            description: None,
            image: None,
            website: None,
            twitter: None,
            telegram: None,
            price_usd: 0.5,
            change_24h_num: 0.0,
            market_cap_usd: market_cap,
            liquidity_usd: 0.0,
            volume_24h: 0.0,
            holders: 0,
            txns_24h: 0,
            price: "$0.5000".to_string(),
            change_24h: "+0.00%".to_string(),
            market_cap: String::new(),
            age: "--".to_string(),
            themes,
            created_at: None,
            creator: None,
            launchpad: None,
            risk_level: RiskLevel::Medium,
        }
    }

    #[test]
    fn test_filter_themed_sorts_by_market_cap_desc() {
        let pool = vec![
            coin("a", 100.0, vec![ThemeId::Dog]),
            coin("b", 300.0, vec![ThemeId::Dog]),
            coin("c", 200.0, vec![ThemeId::Cat]),
        ];
        let (out, fell_back) = filter_themed(pool, ThemeId::Dog);
        let mints: Vec<&str> = out.iter().map(|c| c.mint.as_str()).collect();
        assert_eq!(mints, vec!["b", "a"]);
        assert!(!fell_back);
    }

    #[test]
    fn test_filter_themed_includes_curated_mints() {
        // A curated dog mint without a classifier tag still qualifies.
        let curated_mint = themes::fallback_mints(ThemeId::Dog)[0];
        let pool = vec![coin(curated_mint, 50.0, vec![])];
        let (out, fell_back) = filter_themed(pool, ThemeId::Dog);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].mint, curated_mint);
        assert!(!fell_back);
    }

    #[test]
    fn test_filter_themed_dedupes_by_mint() {
        let pool = vec![
            coin("a", 100.0, vec![ThemeId::Frog]),
            coin("a", 100.0, vec![ThemeId::Frog]),
        ];
        assert_eq!(filter_themed(pool, ThemeId::Frog).0.len(), 1);
    }

    #[test]
    fn test_filter_themed_empty_pool_falls_back() {
        let (out, fell_back) = filter_themed(Vec::new(), ThemeId::Cat);
        assert!(fell_back);
        assert!(!out.is_empty());
        assert!(out.iter().all(|c| c.themes.contains(&ThemeId::Cat)));
    }

    #[test]
    fn test_filter_themed_stable_on_ties() {
        let pool = vec![
            coin("first", 100.0, vec![ThemeId::Ai]),
            coin("second", 100.0, vec![ThemeId::Ai]),
        ];
        let (out, _) = filter_themed(pool, ThemeId::Ai);
        assert_eq!(out[0].mint, "first");
        assert_eq!(out[1].mint, "second");
    }

    #[tokio::test]
    async fn test_cache_or_fetch_serves_valid_entry_without_fetching() {
        let cache = CacheService::local_only();
        let seeded = vec![coin("seed", 1.0, vec![])];
        cache.set("feed:test", &seeded, Duration::from_secs(60)).await;

        let (out, source) = cache_or_fetch(&cache, "feed:test", Duration::from_secs(60), || async {
            panic!("upstream must not be reached on a warm cache");
        })
        .await;
        assert_eq!(source, FeedSource::Cache);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].mint, "seed");
    }

    #[tokio::test]
    async fn test_cache_or_fetch_writes_through_on_success() {
        let cache = CacheService::local_only();
        let (out, source) = cache_or_fetch(&cache, "feed:test", Duration::from_secs(60), || async {
            vec![coin("fresh", 1.0, vec![])]
        })
        .await;
        assert_eq!(source, FeedSource::Upstream);
        assert_eq!(out[0].mint, "fresh");

        let cached = cache.get::<Vec<EnrichedCoin>>("feed:test").await;
        assert_eq!(cached.map(|c| c.len()), Some(1));
    }

    #[tokio::test]
    async fn test_cache_or_fetch_empty_result_is_not_cached() {
        let cache = CacheService::local_only();
        let (out, source) =
            cache_or_fetch(&cache, "feed:test", Duration::from_secs(60), || async { Vec::new() })
                .await;
        assert_eq!(source, FeedSource::Upstream);
        assert!(out.is_empty());
        // The miss stays a miss: the next caller hits upstream again instead
        // of being served an empty payload for the rest of the TTL.
        assert!(cache.get::<Vec<EnrichedCoin>>("feed:test").await.is_none());
    }

    #[tokio::test]
    async fn test_themed_fallback_is_served_but_not_cached() {
        let cache = CacheService::local_only();
        let pool = vec![coin("nothing-doggish", 100.0, vec![ThemeId::Frog])];

        let (out, source) = themed_from_pool(&cache, ThemeId::Dog, pool).await;
        assert_eq!(source, FeedSource::Upstream);
        assert!(!out.is_empty());
        // The substituted list must not occupy the theme key, so the next
        // request re-evaluates against a fresh pool instead of serving the
        // canned coins for the full theme TTL.
        let key = theme_key(ThemeId::Dog);
        assert!(cache.get::<Vec<EnrichedCoin>>(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_themed_match_is_cached() {
        let cache = CacheService::local_only();
        let pool = vec![coin("doggish", 100.0, vec![ThemeId::Dog])];

        let (out, _) = themed_from_pool(&cache, ThemeId::Dog, pool).await;
        assert_eq!(out.len(), 1);
        let key = theme_key(ThemeId::Dog);
        let cached = cache.get::<Vec<EnrichedCoin>>(&key).await;
        assert_eq!(cached.map(|c| c.len()), Some(1));
    }

    #[tokio::test]
    async fn test_cache_or_fetch_retries_upstream_after_empty_result() {
        let cache = CacheService::local_only();
        cache_or_fetch(&cache, "feed:test", Duration::from_secs(60), || async { Vec::new() })
            .await;

        // A later fetch that succeeds replaces the miss rather than an
        // empty cached payload masking it.
        let (out, source) = cache_or_fetch(&cache, "feed:test", Duration::from_secs(60), || async {
            vec![coin("recovered", 1.0, vec![])]
        })
        .await;
        assert_eq!(source, FeedSource::Upstream);
        assert_eq!(out[0].mint, "recovered");
    }
}
