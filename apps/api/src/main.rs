mod auth;
mod cache;
mod config;
mod db;
mod errors;
mod feeds;
mod library;
mod market;
mod models;
mod ratelimit;
mod routes;
mod state;
mod swipes;
mod themes;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cache::CacheService;
use crate::config::Config;
use crate::db::create_pool;
use crate::market::MarketClient;
use crate::ratelimit::RateLimiter;
use crate::routes::build_router;
use crate::state::AppState;
use crate::themes::KeywordClassifier;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting swipefeed API v{}", env!("CARGO_PKG_VERSION"));

    let db = create_pool(&config.database_url).await?;

    // Cache layer: Redis when configured, local-only otherwise.
    let cache = Arc::new(CacheService::connect(config.redis_url.as_deref()).await);

    let market = Arc::new(MarketClient::new(
        config.market_api_url.clone(),
        config.market_api_key.clone(),
    ));
    info!("Market client initialized ({})", config.market_api_url);

    let limiter = Arc::new(RateLimiter::new(config.rate_limit_enabled));
    if !config.rate_limit_enabled {
        info!("Rate limiting disabled; all requests allowed");
    }

    // Default classifier is the keyword matcher; swap the trait object here
    // to change the strategy.
    let classifier = Arc::new(KeywordClassifier);

    let state = AppState {
        db,
        cache,
        market,
        limiter,
        classifier,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    // Connect info feeds the limiter's per-client keying for direct clients.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
