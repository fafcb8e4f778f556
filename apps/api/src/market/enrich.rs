//! Derived-field computation: display formatting, age strings, and the
//! liquidity/volume/age risk heuristic. All pure, recomputed on every fetch.

use chrono::{DateTime, Utc};

use crate::models::coin::RiskLevel;

const HIGH_RISK_LIQUIDITY_USD: f64 = 10_000.0;
const LOW_RISK_LIQUIDITY_USD: f64 = 100_000.0;
const LOW_RISK_VOLUME_USD: f64 = 50_000.0;
const HIGH_RISK_AGE_HOURS: f64 = 24.0;
const LOW_RISK_AGE_HOURS: f64 = 24.0 * 7.0;

/// Compact dollar formatting for market cap / liquidity style figures.
pub fn format_usd(value: f64) -> String {
    let v = value.abs();
    if v >= 1e9 {
        format!("${:.2}B", value / 1e9)
    } else if v >= 1e6 {
        format!("${:.2}M", value / 1e6)
    } else if v >= 1e3 {
        format!("${:.1}K", value / 1e3)
    } else {
        format!("${:.0}", value)
    }
}

/// Price formatting with more precision below a cent, where most meme coins
/// trade.
pub fn format_price(value: f64) -> String {
    if value >= 1.0 {
        format!("${:.2}", value)
    } else if value >= 0.01 {
        format!("${:.4}", value)
    } else {
        format!("${:.8}", value)
    }
}

/// Signed percent string, e.g. "+5.32%" / "-1.20%".
pub fn format_change(pct: f64) -> String {
    if pct >= 0.0 {
        format!("+{:.2}%", pct)
    } else {
        format!("{:.2}%", pct)
    }
}

/// Short age string from launch time: "5m", "3h", "12d", "2mo". "--" when
/// launch time is unknown.
pub fn format_age(created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let created = match created_at {
        Some(t) => t,
        None => return "--".to_string(),
    };
    let minutes = (now - created).num_minutes().max(0);
    if minutes < 60 {
        format!("{}m", minutes)
    } else if minutes < 60 * 24 {
        format!("{}h", minutes / 60)
    } else if minutes < 60 * 24 * 30 {
        format!("{}d", minutes / (60 * 24))
    } else {
        format!("{}mo", minutes / (60 * 24 * 30))
    }
}

/// Risk classification from the numeric snapshot.
///
/// High: thin liquidity or launched within the last day.
/// Low: deep liquidity, sustained volume, and at least a week on chain.
/// Medium: everything else. Unknown age counts toward high risk only when
/// liquidity is also thin.
pub fn risk_level(
    liquidity_usd: f64,
    volume_24h: f64,
    created_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> RiskLevel {
    let age_hours = created_at.map(|t| (now - t).num_minutes().max(0) as f64 / 60.0);

    if liquidity_usd < HIGH_RISK_LIQUIDITY_USD {
        return RiskLevel::High;
    }
    if let Some(age) = age_hours {
        if age < HIGH_RISK_AGE_HOURS {
            return RiskLevel::High;
        }
        if liquidity_usd >= LOW_RISK_LIQUIDITY_USD
            && volume_24h >= LOW_RISK_VOLUME_USD
            && age >= LOW_RISK_AGE_HOURS
        {
            return RiskLevel::Low;
        }
    }
    RiskLevel::Medium
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_format_usd_scales() {
        assert_eq!(format_usd(2_340_000_000.0), "$2.34B");
        assert_eq!(format_usd(5_600_000.0), "$5.60M");
        assert_eq!(format_usd(7_890.0), "$7.9K");
        assert_eq!(format_usd(12.0), "$12");
    }

    #[test]
    fn test_format_price_precision() {
        assert_eq!(format_price(1.5), "$1.50");
        assert_eq!(format_price(0.0234), "$0.0234");
        assert_eq!(format_price(0.00001234), "$0.00001234");
    }

    #[test]
    fn test_format_change_sign() {
        assert_eq!(format_change(5.321), "+5.32%");
        assert_eq!(format_change(-1.2), "-1.20%");
        assert_eq!(format_change(0.0), "+0.00%");
    }

    #[test]
    fn test_format_age_buckets() {
        let now = Utc::now();
        assert_eq!(format_age(Some(now - Duration::minutes(5)), now), "5m");
        assert_eq!(format_age(Some(now - Duration::hours(3)), now), "3h");
        assert_eq!(format_age(Some(now - Duration::days(12)), now), "12d");
        assert_eq!(format_age(Some(now - Duration::days(65)), now), "2mo");
        assert_eq!(format_age(None, now), "--");
    }

    #[test]
    fn test_risk_thin_liquidity_is_high() {
        let now = Utc::now();
        let old = Some(now - Duration::days(30));
        assert_eq!(risk_level(500.0, 1_000_000.0, old, now), RiskLevel::High);
    }

    #[test]
    fn test_risk_fresh_launch_is_high() {
        let now = Utc::now();
        let fresh = Some(now - Duration::hours(2));
        assert_eq!(risk_level(50_000.0, 10_000.0, fresh, now), RiskLevel::High);
    }

    #[test]
    fn test_risk_established_is_low() {
        let now = Utc::now();
        let old = Some(now - Duration::days(30));
        assert_eq!(risk_level(250_000.0, 80_000.0, old, now), RiskLevel::Low);
    }

    #[test]
    fn test_risk_unknown_age_is_medium() {
        let now = Utc::now();
        assert_eq!(risk_level(250_000.0, 80_000.0, None, now), RiskLevel::Medium);
    }
}
