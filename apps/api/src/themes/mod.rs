//! Theme classification — pluggable, trait-based tagging of coins into
//! thematic categories (dog coins, AI coins, ...).
//!
//! Default: `KeywordClassifier` (pure-Rust, deterministic, substring-based).
//! `AppState` holds an `Arc<dyn Classifier>`, so the substring heuristic can
//! be swapped for a stricter tokenizer without touching callers.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::future::Future;
use std::str::FromStr;
use tracing::warn;

use crate::market::enrich;
use crate::models::coin::{EnrichedCoin, RiskLevel};

/// Registered theme categories. Membership is many-to-many and computed,
/// never stored as primary truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeId {
    Dog,
    Cat,
    Frog,
    Ai,
    Political,
    Celebrity,
    Food,
    Gaming,
    Sports,
}

impl ThemeId {
    pub fn all() -> &'static [ThemeId] {
        &[
            ThemeId::Dog,
            ThemeId::Cat,
            ThemeId::Frog,
            ThemeId::Ai,
            ThemeId::Political,
            ThemeId::Celebrity,
            ThemeId::Food,
            ThemeId::Gaming,
            ThemeId::Sports,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeId::Dog => "dog",
            ThemeId::Cat => "cat",
            ThemeId::Frog => "frog",
            ThemeId::Ai => "ai",
            ThemeId::Political => "political",
            ThemeId::Celebrity => "celebrity",
            ThemeId::Food => "food",
            ThemeId::Gaming => "gaming",
            ThemeId::Sports => "sports",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ThemeId::Dog => "Dog Coins",
            ThemeId::Cat => "Cat Coins",
            ThemeId::Frog => "Frog Coins",
            ThemeId::Ai => "AI Coins",
            ThemeId::Political => "Political",
            ThemeId::Celebrity => "Celebrity",
            ThemeId::Food => "Food Coins",
            ThemeId::Gaming => "Gaming",
            ThemeId::Sports => "Sports",
        }
    }

    /// Keyword substrings tested against lowercased coin text.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            ThemeId::Dog => &["dog", "doge", "shib", "inu", "puppy", "wif", "bonk", "woof"],
            ThemeId::Cat => &["cat", "kitty", "kitten", "meow", "popcat", "mew"],
            ThemeId::Frog => &["frog", "pepe", "toad", "ribbit", "kek"],
            ThemeId::Ai => &["ai", "gpt", "agent", "neural", "bot", "terminal"],
            ThemeId::Political => &["trump", "biden", "maga", "president", "election", "politic"],
            ThemeId::Celebrity => &["elon", "musk", "kanye", "drake", "celeb", "kardashian"],
            ThemeId::Food => &["peanut", "burger", "pizza", "taco", "banana", "coffee", "chill"],
            ThemeId::Gaming => &["game", "gaming", "pixel", "arcade", "quest", "rpg"],
            ThemeId::Sports => &["ball", "soccer", "football", "nba", "goal", "sport"],
        }
    }
}

impl FromStr for ThemeId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dog" => Ok(ThemeId::Dog),
            "cat" => Ok(ThemeId::Cat),
            "frog" => Ok(ThemeId::Frog),
            "ai" => Ok(ThemeId::Ai),
            "political" => Ok(ThemeId::Political),
            "celebrity" => Ok(ThemeId::Celebrity),
            "food" => Ok(ThemeId::Food),
            "gaming" => Ok(ThemeId::Gaming),
            "sports" => Ok(ThemeId::Sports),
            _ => Err(()),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Classifier trait
// ────────────────────────────────────────────────────────────────────────────

/// Maps coin text to zero or more themes. Implementations must be
/// deterministic: the same text always yields the same theme set.
pub trait Classifier: Send + Sync {
    fn detect(&self, text: &str) -> Vec<ThemeId>;
}

/// Substring-based keyword matcher.
///
/// Matches substrings, not whole words, so "catastrophe" matches the cat
/// theme. Known approximation, accepted for recall.
pub struct KeywordClassifier;

impl Classifier for KeywordClassifier {
    fn detect(&self, text: &str) -> Vec<ThemeId> {
        let haystack = text.to_lowercase();
        ThemeId::all()
            .iter()
            .copied()
            .filter(|theme| theme.keywords().iter().any(|kw| haystack.contains(kw)))
            .collect()
    }
}

/// Concatenates a coin's name, symbol, and description into the text fed to
/// the classifier.
pub fn coin_text(name: &str, symbol: &str, description: Option<&str>) -> String {
    format!("{} {} {}", name, symbol, description.unwrap_or(""))
}

// ────────────────────────────────────────────────────────────────────────────
// Curated fallback registry
// ────────────────────────────────────────────────────────────────────────────

/// Well-known coins per theme. Substituted when live classification yields
/// nothing, so a themed feed is never empty. Each mint is listed under
/// exactly one theme.
pub fn fallback_registry(theme: ThemeId) -> &'static [(&'static str, &'static str, &'static str)] {
    // (mint, name, symbol)
    match theme {
        ThemeId::Dog => &[
            ("EKpQGSJtjMFqKZ9KQanSqYXRcF8fBopzLHYxdM65zcjm", "dogwifhat", "WIF"),
            ("DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263", "Bonk", "BONK"),
            ("HhJpBhRRn4g56VsyLuT8DL5Bv31HkXqsrahTTUCZeZg4", "Myro", "MYRO"),
        ],
        ThemeId::Cat => &[
            ("7GCihgDB8fe6KNjn2MYtkzZcRjQy3t9GHdC8uHYmW2hr", "Popcat", "POPCAT"),
            ("MEW1gQWJ3nEXg2qgERiKu7FAFj79PHvQVREQUzScPP5", "cat in a dogs world", "MEW"),
        ],
        ThemeId::Frog => &[
            ("B5WTLaRwaUQpKk7ir1wniNB6m5o8GgMrimhKMYan2R6B", "Pepe", "PEPE"),
            ("Df6yfrKC8kZE3KNkrHERKzAetSxbrWeniQfyJY4Jpump", "chill guy", "CHILLGUY"),
        ],
        ThemeId::Ai => &[
            ("CzLSujWBLFsSjncfkh59rUFqvafWcY5tzedWJSuypump", "Goatseus Maximus", "GOAT"),
            ("GJAFwWjJ3vnTsrQVabjBVK2TYB1YtRCQXRDfDgUnpump", "Act I The AI Prophecy", "ACT"),
        ],
        ThemeId::Political => &[
            ("6p6xgHyF7AeE6TZkSmFsko444wqoP15icUSqi2jfGiPN", "OFFICIAL TRUMP", "TRUMP"),
            ("Ed1sEk7ixVpPBNWYrFgsmS5iju1rrDPLgWc4bfuY9BQ5", "Jeo Boden", "BODEN"),
        ],
        ThemeId::Celebrity => &[
            ("HeLp6NuQkmYB4pYWo2zYs22mESHXPQYzXbB8n4V98jwC", "ai16z", "AI16Z"),
        ],
        ThemeId::Food => &[
            ("2qEHjDLDLbuBgRYvsxhc5D6uDWAivNFZGan56P1tpump", "Peanut the Squirrel", "PNUT"),
        ],
        ThemeId::Gaming => &[
            ("ATLASXmbPQxBUYbxPsV97usA3fPQYEqzQBUHgiFCUsXx", "Star Atlas", "ATLAS"),
        ],
        ThemeId::Sports => &[
            ("FanqffqsVhVXRSG4N8cdGhcXe59gKbnNUJjPcSfopump", "FanCoin", "FAN"),
        ],
    }
}

/// Builds display-ready coins from the curated registry. Market numerics are
/// zeroed; these entries exist to keep a themed feed non-empty, not to carry
/// live data.
pub fn fallback_coins(theme: ThemeId) -> Vec<EnrichedCoin> {
    fallback_registry(theme)
        .iter()
        .map(|(mint, name, symbol)| EnrichedCoin {
            mint: mint.to_string(),
            name: name.to_string(),
            symbol: symbol.to_string(),
            description: None,
            image: None,
            website: None,
            twitter: None,
            telegram: None,
            price_usd: 0.0,
            change_24h_num: 0.0,
            market_cap_usd: 0.0,
            liquidity_usd: 0.0,
            volume_24h: 0.0,
            holders: 0,
            txns_24h: 0,
            price: enrich::format_price(0.0),
            change_24h: enrich::format_change(0.0),
            market_cap: enrich::format_usd(0.0),
            age: "--".to_string(),
            themes: vec![theme],
            created_at: None,
            creator: None,
            launchpad: None,
            risk_level: RiskLevel::Medium,
        })
        .collect()
}

/// Mints in the curated registry for one theme.
pub fn fallback_mints(theme: ThemeId) -> Vec<&'static str> {
    fallback_registry(theme).iter().map(|(m, _, _)| *m).collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Denormalized DB mirror
// ────────────────────────────────────────────────────────────────────────────

/// Persists one (mint, theme) association. Append-if-absent, so concurrent
/// taggers converge on the same set.
pub async fn tag_coin(db: &PgPool, mint: &str, theme: ThemeId) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO coin_themes (coin_mint, theme) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(mint)
    .bind(theme.as_str())
    .execute(db)
    .await?;
    Ok(())
}

/// Mirrors classifier output for a fetched coin list into the database.
///
/// Best-effort denormalization only; the live classifier stays authoritative
/// and this mirror is rebuildable at any time. Failures are logged, never
/// propagated, so a degraded database cannot fail a feed render.
pub async fn auto_tag_famous_coins(db: &PgPool, coins: &[EnrichedCoin]) {
    tag_all(coins, |mint, theme| async move { tag_coin(db, &mint, theme).await }).await;
}

/// Runs `tag` for every (mint, theme) association in `coins`. A failed
/// association is logged and skipped; the remaining coins still get tagged.
async fn tag_all<F, Fut>(coins: &[EnrichedCoin], mut tag: F)
where
    F: FnMut(String, ThemeId) -> Fut,
    Fut: Future<Output = Result<(), sqlx::Error>>,
{
    for coin in coins {
        for theme in &coin.themes {
            if let Err(e) = tag(coin.mint.clone(), *theme).await {
                warn!("auto-tag failed for {} -> {}: {e}", coin.mint, theme.as_str());
            }
        }
    }
}
