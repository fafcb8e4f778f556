use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Optional. Absent means the distributed cache layer is skipped and
    /// caching stays process-local.
    pub redis_url: Option<String>,
    pub market_api_url: String,
    pub market_api_key: Option<String>,
    pub port: u16,
    pub rust_log: String,
    /// Kill-switch for the sliding-window limiter. Disabled means fail-open:
    /// every request is allowed.
    pub rate_limit_enabled: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: optional_env("REDIS_URL"),
            market_api_url: std::env::var("MARKET_API_URL")
                .unwrap_or_else(|_| "https://data.solanatracker.io".to_string()),
            market_api_key: optional_env("MARKET_API_KEY"),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            rate_limit_enabled: std::env::var("RATE_LIMIT_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
