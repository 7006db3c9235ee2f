//! Market matching for cross-exchange arbitrage.
//!
//! This module provides functionality to match equivalent markets across
//! Kalshi and Polymarket exchanges, ensuring settlement criteria alignment.

use algo_trade_core::venue_client::{MarketEvent, Venue};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info};

use crate::types::{MarketPair, PairKind};

// =============================================================================
// Helper Functions
// =============================================================================

/// Extracts a price value from text.
///
/// Handles formats like "$100,000", "$100k", "100000", etc.
fn extract_price_from_text(text: &str) -> Option<Decimal> {
    // Remove common formatting
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == 'k' || *c == 'K')
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    // Handle "k" suffix for thousands
    if cleaned.to_lowercase().ends_with('k') {
        let num_part = &cleaned[..cleaned.len() - 1];
        let value: Decimal = num_part.parse().ok()?;
        return Some(value * dec!(1000));
    }

    cleaned.parse().ok()
}

// =============================================================================
// MarketEvent equivalence (six ordered rules)
// =============================================================================

/// Max allowed resolution-time skew between the two sides of a pair.
pub const MAX_RESOLUTION_SKEW_SECONDS: i64 = 60;

/// Assets the extractor recognizes from title substrings.
const KNOWN_ASSETS: [&str; 3] = ["BTC", "ETH", "SOL"];

/// Alias groups for resolution-source compatibility (e.g. "Coinbase").
const SOURCE_ALIAS_GROUPS: [&[&str]; 2] = [
    &["coinbase", "cb"],
    &["cf benchmarks", "cfbenchmarks", "cf-benchmarks"],
];

/// Extracts the set of recognized assets mentioned in a title.
fn extract_assets(title: &str) -> Vec<&'static str> {
    let lower = title.to_lowercase();
    KNOWN_ASSETS
        .iter()
        .copied()
        .filter(|asset| {
            lower.contains(&asset.to_lowercase())
                || (*asset == "BTC" && lower.contains("bitcoin"))
                || (*asset == "ETH" && lower.contains("ethereum"))
                || (*asset == "SOL" && lower.contains("solana"))
        })
        .collect()
}

/// True if both titles are "up-or-down" style (mention both directions).
fn is_up_or_down(title: &str) -> bool {
    let lower = title.to_lowercase();
    lower.contains("up") && lower.contains("down")
}

/// Extracts a numeric strike above $500 from a title, if present.
fn extract_strike_above_500(title: &str) -> Option<Decimal> {
    let value = extract_price_from_text(title)?;
    (value > dec!(500)).then_some(value)
}

/// True if two resolution-source strings are substring-compatible or share
/// an alias group.
fn sources_compatible(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return true;
    }
    let (a_lower, b_lower) = (a.to_lowercase(), b.to_lowercase());
    if a_lower.contains(&b_lower) || b_lower.contains(&a_lower) {
        return true;
    }
    SOURCE_ALIAS_GROUPS.iter().any(|group| {
        group.iter().any(|alias| a_lower.contains(alias))
            && group.iter().any(|alias| b_lower.contains(alias))
    })
}

/// Character-level similarity ratio in `[0, 1]`, case-folded.
///
/// Based on the length of the longest common subsequence over the combined
/// length of both strings (a cheap Ratcliff/Obershelp-style approximation).
fn title_similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let lcs = longest_common_subsequence(&a_chars, &b_chars);
    (2.0 * lcs as f64) / (a_chars.len() + b_chars.len()) as f64
}

fn longest_common_subsequence(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Decides equivalence of `(eventK, eventP)`, applying the six rules in
/// order. Rejection at any step returns `None`. Symmetric: swapping the
/// arguments (and their venues) yields the same verdict.
#[must_use]
pub fn match_events(event_k: &MarketEvent, event_p: &MarketEvent) -> Option<MarketPair> {
    let (k, p) = match (event_k.venue, event_p.venue) {
        (Venue::K, Venue::P) => (event_k, event_p),
        (Venue::P, Venue::K) => (event_p, event_k),
        _ => return None, // Rule 1: different venue required.
    };

    // Rule 2: resolution times within 60s.
    let skew = (k.resolution_time - p.resolution_time).num_seconds().abs();
    if skew > MAX_RESOLUTION_SKEW_SECONDS {
        debug!(skew, "matcher: resolution time skew too large");
        return None;
    }

    // Rule 3: recognized assets intersect.
    let k_assets = extract_assets(&k.title);
    let p_assets = extract_assets(&p.title);
    if k_assets.is_empty() || p_assets.is_empty() || !k_assets.iter().any(|a| p_assets.contains(a)) {
        debug!(k_title = %k.title, p_title = %p.title, "matcher: no common asset");
        return None;
    }

    // Rule 4: direction parity.
    let both_updown = is_up_or_down(&k.title) && is_up_or_down(&p.title);
    let kind = if both_updown {
        PairKind::Heuristic15m
    } else {
        let k_strike = extract_strike_above_500(&k.title);
        let p_strike = extract_strike_above_500(&p.title);
        match (k_strike, p_strike) {
            (Some(ks), Some(ps)) => {
                if (ks - ps).abs() > dec!(10) {
                    debug!(%ks, %ps, "matcher: strike mismatch");
                    return None;
                }
                PairKind::Generic
            }
            (Some(_), None) | (None, Some(_)) => {
                debug!("matcher: fixed-strike vs directional mismatch");
                return None;
            }
            (None, None) => {
                // Rule 5: source compatibility.
                if !sources_compatible(&k.resolution_source, &p.resolution_source) {
                    debug!("matcher: incompatible resolution sources");
                    return None;
                }
                // Rule 6: title similarity fallback.
                let sim = title_similarity(&k.title, &p.title);
                if sim < 0.6 {
                    debug!(sim, "matcher: title similarity below threshold");
                    return None;
                }
                PairKind::Generic
            }
        }
    };

    // Rule 5 also applies on the up-or-down path when both declare a source.
    if both_updown && !sources_compatible(&k.resolution_source, &p.resolution_source) {
        debug!("matcher: incompatible resolution sources (up/down path)");
        return None;
    }

    info!(
        k_id = %k.instrument_id,
        p_id = %p.instrument_id,
        ?kind,
        "matcher: pair accepted"
    );
    Some(MarketPair::new(k.clone(), p.clone(), kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Helper Function Tests ====================

    #[test]
    fn test_extract_price_from_text_dollars() {
        assert_eq!(extract_price_from_text("$100,000"), Some(dec!(100000)));
        assert_eq!(extract_price_from_text(" $100000"), Some(dec!(100000)));
    }

    #[test]
    fn test_extract_price_from_text_k_suffix() {
        assert_eq!(extract_price_from_text("$100k"), Some(dec!(100000)));
        assert_eq!(extract_price_from_text("100K"), Some(dec!(100000)));
    }

    #[test]
    fn test_extract_price_from_text_plain() {
        assert_eq!(extract_price_from_text("100000"), Some(dec!(100000)));
        assert_eq!(extract_price_from_text("95000"), Some(dec!(95000)));
    }

    #[test]
    fn test_extract_price_from_text_decimal() {
        assert_eq!(extract_price_from_text("99.5k"), Some(dec!(99500)));
    }

    #[test]
    fn test_extract_price_from_text_invalid() {
        assert!(extract_price_from_text("").is_none());
        assert!(extract_price_from_text("no numbers").is_none());
    }

    // ==================== match_events Tests ====================

    fn event(venue: Venue, title: &str, resolution_time: DateTime<Utc>, source: &str) -> MarketEvent {
        MarketEvent {
            venue,
            instrument_id: format!("{venue:?}-{title}"),
            venue_ticker: title.to_string(),
            title: title.to_string(),
            resolution_time,
            yes_ask: Some(dec!(0.5)),
            no_ask: Some(dec!(0.5)),
            cumulative_volume: Decimal::ZERO,
            resolution_source: source.to_string(),
            metadata: algo_trade_core::venue_client::MarketMetadata::Kalshi,
        }
    }

    #[test]
    fn test_match_events_updown_accepts() {
        let t = Utc::now() + chrono::Duration::hours(1);
        let k = event(Venue::K, "Bitcoin Up or Down at 3pm?", t, "Coinbase");
        let p = event(Venue::P, "Will BTC go up or down?", t, "coinbase");
        assert!(match_events(&k, &p).is_some());
    }

    #[test]
    fn test_match_events_symmetric() {
        let t = Utc::now() + chrono::Duration::hours(1);
        let k = event(Venue::K, "Bitcoin Up or Down at 3pm?", t, "");
        let p = event(Venue::P, "Will BTC go up or down?", t, "");
        assert_eq!(match_events(&k, &p).is_some(), match_events(&p, &k).is_some());
    }

    #[test]
    fn test_match_events_rejects_same_venue() {
        let t = Utc::now() + chrono::Duration::hours(1);
        let k1 = event(Venue::K, "Bitcoin Up or Down?", t, "");
        let k2 = event(Venue::K, "Bitcoin Up or Down?", t, "");
        assert!(match_events(&k1, &k2).is_none());
    }

    #[test]
    fn test_match_events_rejects_resolution_skew() {
        let t = Utc::now() + chrono::Duration::hours(1);
        let k = event(Venue::K, "Bitcoin Up or Down?", t, "");
        let p = event(Venue::P, "Will BTC go up or down?", t + chrono::Duration::seconds(120), "");
        assert!(match_events(&k, &p).is_none());
    }

    #[test]
    fn test_match_events_rejects_no_common_asset() {
        let t = Utc::now() + chrono::Duration::hours(1);
        let k = event(Venue::K, "Bitcoin Up or Down?", t, "");
        let p = event(Venue::P, "Will ETH go up or down?", t, "");
        assert!(match_events(&k, &p).is_none());
    }

    #[test]
    fn test_match_events_strike_within_tolerance() {
        let t = Utc::now() + chrono::Duration::hours(1);
        let k = event(Venue::K, "Will BTC be above $100,000?", t, "");
        let p = event(Venue::P, "Bitcoin above 100005 by 3pm", t, "");
        assert!(match_events(&k, &p).is_some());
    }

    #[test]
    fn test_match_events_strike_mismatch_rejects() {
        let t = Utc::now() + chrono::Duration::hours(1);
        let k = event(Venue::K, "Will BTC be above $100,000?", t, "");
        let p = event(Venue::P, "Bitcoin above 95000 by 3pm", t, "");
        assert!(match_events(&k, &p).is_none());
    }

    #[test]
    fn test_match_events_fixed_strike_vs_directional_rejects() {
        let t = Utc::now() + chrono::Duration::hours(1);
        let k = event(Venue::K, "Will BTC be above $100,000?", t, "");
        let p = event(Venue::P, "Will BTC go up or down?", t, "");
        assert!(match_events(&k, &p).is_none());
    }

    #[test]
    fn test_title_similarity_identical() {
        assert!((title_similarity("bitcoin up", "bitcoin up") - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_title_similarity_unrelated() {
        assert!(title_similarity("bitcoin up or down", "xyz completely different") < 0.6);
    }
}
