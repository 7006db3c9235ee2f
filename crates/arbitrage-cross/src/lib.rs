//! Cross-exchange arbitrage detection and orchestration.
//!
//! This crate provides tools for detecting and executing arbitrage opportunities
//! between Kalshi and Polymarket prediction markets.
//!
//! # Overview
//!
//! When the same event (e.g., "BTC above $100k at 3pm") is priced differently
//! across exchanges, buying opposing positions can guarantee profit:
//!
//! ```text
//! Kalshi:     YES @ $0.55,  NO @ $0.46  (internal spread)
//! Polymarket: YES @ $0.52,  NO @ $0.50  (internal spread)
//!
//! Cross-exchange opportunity:
//!   Buy Kalshi NO     @ $0.46
//!   Buy Polymarket YES @ $0.52
//!   Total cost:         $0.98
//!   Guaranteed payout:  $1.00
//!   Gross profit:       $0.02 (2.04%)
//! ```
//!
//! # Modules
//!
//! - [`types`]: Core types for cross-exchange operations, including the
//!   Matcher's `MarketPair` output
//! - [`fees`]: Fee calculations for both exchanges
//! - [`matcher`]: Match equivalent markets across exchanges
//! - [`detector`]: Detect arbitrage opportunities
//!
//! # Example
//!
//! ```ignore
//! use algo_trade_arbitrage_cross::{CrossExchangeDetector, DetectorConfig, match_events};
//!
//! let detector = CrossExchangeDetector::with_config(DetectorConfig::default());
//!
//! if let Some(pair) = match_events(&k_event, &p_event) {
//!     let (hard, prob, _no_buy_reason) = detector.detect(&pair, &k_book, &p_book);
//!     if let Some(opp) = hard {
//!         println!("net profit {} via {:?}", opp.net_profit, opp.direction);
//!     }
//! }
//! ```
//!
//! # Safety
//!
//! **CRITICAL**: Before executing arbitrage, always verify:
//!
//! 1. The matched pair still resolves on the same criteria (`match_events`'s
//!    six ordered rules exist precisely to catch drift here).
//! 2. Both venues are operational and books are fresh.
//! 3. Sufficient balance on both venues.
//!
//! Mismatched settlement criteria can turn guaranteed arbitrage into a gamble.

pub mod book_cache;
pub mod controller;
pub mod detector;
pub mod event_log;
pub mod executor;
pub mod fees;
pub mod matcher;
pub mod risk_gate;
pub mod types;

// Re-export main types for convenience
pub use book_cache::{BookCache, FRESHNESS_WINDOW};
pub use controller::{Controller, PairState};
pub use detector::{CrossExchangeDetector, Direction, DetectorConfig, Opportunity, OpportunityKind};
pub use event_log::{EventLog, QUEUE_CAPACITY};
pub use executor::{CrossExecutor, ExecutorConfig, FILL_POLL_BACKOFF};
pub use fees::{FeeCalculator, FeeConfig};
pub use matcher::match_events;
pub use risk_gate::{RiskGate, BALANCE_SYNC_INTERVAL};
pub use types::{Exchange, MarketPair, PairKind, Side, TradeOutcome, TradeRecord, UnwindAction};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_exports() {
        let _ = FeeCalculator::new();
        let _ = CrossExchangeDetector::new();
        let _ = DetectorConfig::default();
        let _ = FeeConfig::default();
    }

    #[test]
    fn test_types_accessible() {
        let _ = Side::Yes;
        let _ = Side::No;
        let _ = Exchange::Kalshi;
        let _ = Exchange::Polymarket;
    }
}
