use std::sync::Arc;

use sqlx::PgPool;

use crate::cache::CacheService;
use crate::config::Config;
use crate::market::MarketClient;
use crate::ratelimit::RateLimiter;
use crate::themes::Classifier;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Injectable cache service: constructed once in `main`, fresh per test.
    pub cache: Arc<CacheService>,
    pub market: Arc<MarketClient>,
    pub limiter: Arc<RateLimiter>,
    /// Pluggable theme classifier. Default: KeywordClassifier.
    pub classifier: Arc<dyn Classifier>,
    pub config: Config,
}
