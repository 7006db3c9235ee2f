//! Shared capability set implemented by each venue's client.
//!
//! `algo-trade-kalshi` and `algo-trade-polymarket` each provide one
//! implementation of [`VenueClient`]; a third, in-memory implementation
//! exists purely for tests (a scripted venue replaying a fixed sequence of
//! book snapshots and order outcomes) and is never wired into the live
//! [`Controller`](crate) path.
//!
//! All network calls made by an implementation must honor [`CALL_DEADLINE`]
//! and report failures as [`crate::error::ErrorKind`]; nothing above this
//! trait boundary inspects a raw HTTP status code or venue-native error.

use crate::error::ErrorKind;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound on any single network call made by a `VenueClient`.
pub const CALL_DEADLINE: Duration = Duration::from_secs(5);

/// Which of the two venues an instrument or order belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Venue {
    /// The Kalshi-like exchange-traded venue.
    K,
    /// The Polymarket-like outcome-token venue.
    P,
}

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Venue::K => write!(f, "K"),
            Venue::P => write!(f, "P"),
        }
    }
}

/// Which side of a binary market an order or quote refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeSide {
    Yes,
    No,
}

/// An instrument on one venue, as of the last update.
///
/// Events are immutable snapshots; the "current" event per instrument is
/// replaced atomically on each update by the venue's stream reader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketEvent {
    pub venue: Venue,
    /// Stable id used to key the instrument across updates.
    pub instrument_id: String,
    /// Venue-native ticker or condition id, for display and API calls.
    pub venue_ticker: String,
    pub title: String,
    pub resolution_time: DateTime<Utc>,
    /// Best ask for the YES outcome, in probability units [0, 1].
    pub yes_ask: Option<Decimal>,
    /// Best ask for the NO outcome, in probability units [0, 1].
    pub no_ask: Option<Decimal>,
    pub cumulative_volume: Decimal,
    pub resolution_source: String,
    /// Venue-specific opaque metadata, e.g. venue P's pair of outcome
    /// token ids. Never inspected outside the owning VenueClient and the
    /// Executor, which threads it back into `place_order`.
    pub metadata: MarketMetadata,
}

impl MarketEvent {
    /// `yes_ask + no_ask >= 1.0` should hold whenever both sides are
    /// liquid; a violation of that invariant is itself the arbitrage
    /// signal, so this returns the violation rather than panicking.
    #[must_use]
    pub fn combined_ask(&self) -> Option<Decimal> {
        Some(self.yes_ask? + self.no_ask?)
    }
}

/// Venue-specific fields carried alongside a `MarketEvent`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MarketMetadata {
    /// Venue K identifies a market by ticker alone; no extra fields needed.
    Kalshi,
    /// Venue P requires the YES/NO outcome token ids to place orders.
    Polymarket {
        yes_token_id: String,
        no_token_id: String,
        neg_risk: bool,
    },
}

/// A single price level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub size: Decimal,
}

/// Top-of-book view of an instrument, venue-agnostic.
///
/// Venue K's book is framed as YES side / NO side; venue P's is framed as
/// bids / asks on a single outcome token. Both reduce to the same shape:
/// the best price a taker could buy at (`best_ask`) and sell at
/// (`best_bid`) for each outcome side relevant to the arbitrage leg.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBook {
    pub instrument_id: String,
    pub yes_bid: Option<PriceLevel>,
    pub yes_ask: Option<PriceLevel>,
    pub no_bid: Option<PriceLevel>,
    pub no_ask: Option<PriceLevel>,
    pub updated_at: DateTime<Utc>,
}

impl OrderBook {
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        match chrono::Duration::from_std(max_age) {
            Ok(max_age) => now - self.updated_at <= max_age,
            Err(_) => false,
        }
    }
}

/// Outcome of a `query_order` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderFillStatus {
    Pending,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderFillStatus {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Cancelled | Self::Rejected
        )
    }
}

/// Status and filled size for a previously placed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderState {
    pub status: OrderFillStatus,
    pub filled_size: Decimal,
}

/// A filter describing which instruments `discover` should return.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryFilter {
    /// Case-insensitive keywords matched against title/ticker (e.g. BTC, ETH, SOL).
    pub asset_keywords: Vec<String>,
    /// Only return instruments resolving within this many seconds.
    pub max_resolution_secs: Option<i64>,
}

/// One update delivered by a venue's book subscription stream.
#[derive(Debug, Clone)]
pub struct BookUpdate {
    pub instrument_id: String,
    pub book: OrderBook,
}

/// Capability set common to both venues. See module docs for the
/// in-memory test double's contract.
#[async_trait]
pub trait VenueClient: Send + Sync {
    /// Lists instruments matching `filter`. REST call, deadline-bound.
    async fn discover(&self, filter: &DiscoveryFilter) -> Result<Vec<MarketEvent>, ErrorKind>;

    /// Re-fetches a single instrument by id, or `None` if it no longer exists.
    async fn refresh(&self, instrument_id: &str) -> Result<Option<MarketEvent>, ErrorKind>;

    /// Opens a streaming subscription for the given instrument ids.
    ///
    /// Implementations reconnect and re-subscribe on transient websocket
    /// drops; callers never see a `Transient` error from an open stream,
    /// only a closed channel once retries are exhausted.
    async fn subscribe(
        &self,
        instrument_ids: &[String],
    ) -> Result<tokio::sync::mpsc::Receiver<BookUpdate>, ErrorKind>;

    /// REST fallback for top-of-book when no fresh streamed book exists.
    async fn top_of_book(&self, instrument_id: &str) -> Result<Option<OrderBook>, ErrorKind>;

    /// Available balance in account currency units, if the venue exposes one.
    async fn balance(&self) -> Result<Option<Decimal>, ErrorKind>;

    /// Places a limit order. `metadata` carries venue P's outcome token id.
    async fn place_order(
        &self,
        instrument_id: &str,
        side: OutcomeSide,
        size: Decimal,
        limit_price: Decimal,
        metadata: &MarketMetadata,
    ) -> Result<String, ErrorKind>;

    async fn query_order(&self, order_id: &str) -> Result<OrderState, ErrorKind>;

    async fn cancel_order(&self, order_id: &str) -> Result<(), ErrorKind>;

    fn venue(&self) -> Venue;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_ask_flags_dislocation() {
        let event = MarketEvent {
            venue: Venue::K,
            instrument_id: "i1".to_string(),
            venue_ticker: "KXBTC-1".to_string(),
            title: "BTC above 100k".to_string(),
            resolution_time: Utc::now(),
            yes_ask: Some(Decimal::new(45, 2)),
            no_ask: Some(Decimal::new(50, 2)),
            cumulative_volume: Decimal::ZERO,
            resolution_source: "coinbase".to_string(),
            metadata: MarketMetadata::Kalshi,
        };
        assert_eq!(event.combined_ask(), Some(Decimal::new(95, 2)));
        assert!(event.combined_ask().unwrap() < Decimal::ONE);
    }

    #[test]
    fn combined_ask_is_none_when_either_side_illiquid() {
        let event = MarketEvent {
            venue: Venue::P,
            instrument_id: "i2".to_string(),
            venue_ticker: "cond-1".to_string(),
            title: "ETH above 4k".to_string(),
            resolution_time: Utc::now(),
            yes_ask: None,
            no_ask: Some(Decimal::new(50, 2)),
            cumulative_volume: Decimal::ZERO,
            resolution_source: "coinbase".to_string(),
            metadata: MarketMetadata::Polymarket {
                yes_token_id: "yes".to_string(),
                no_token_id: "no".to_string(),
                neg_risk: true,
            },
        };
        assert_eq!(event.combined_ask(), None);
    }

    #[test]
    fn order_book_freshness_respects_ttl() {
        let now = Utc::now();
        let book = OrderBook {
            instrument_id: "i1".to_string(),
            yes_bid: None,
            yes_ask: None,
            no_bid: None,
            no_ask: None,
            updated_at: now - chrono::Duration::milliseconds(400),
        };
        assert!(book.is_fresh(now, Duration::from_millis(500)));
        assert!(!book.is_fresh(now, Duration::from_millis(300)));
    }

    #[test]
    fn terminal_statuses() {
        assert!(OrderFillStatus::Filled.is_terminal());
        assert!(OrderFillStatus::Cancelled.is_terminal());
        assert!(OrderFillStatus::Rejected.is_terminal());
        assert!(!OrderFillStatus::Pending.is_terminal());
        assert!(!OrderFillStatus::PartiallyFilled.is_terminal());
    }
}
