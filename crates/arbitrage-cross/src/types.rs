//! Shared types for cross-exchange arbitrage operations.
//!
//! This module defines the core data structures used across the arbitrage system
//! for matching markets, detecting opportunities, and tracking execution.

use algo_trade_core::venue_client::MarketEvent;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Side Types (unified across exchanges)
// =============================================================================

/// Unified side type for cross-exchange operations.
///
/// Maps to YES/NO on Kalshi and Up/Down on Polymarket 15-min markets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Betting on price going up (YES on Kalshi, Up on Polymarket).
    Yes,
    /// Betting on price going down (NO on Kalshi, Down on Polymarket).
    No,
}

impl Side {
    /// Returns the opposite side.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Yes => Self::No,
            Self::No => Self::Yes,
        }
    }

    /// Returns the display string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "YES",
            Self::No => "NO",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Exchange Identifiers
// =============================================================================

/// Identifies which exchange a position or order belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exchange {
    /// Kalshi prediction market.
    Kalshi,
    /// Polymarket CLOB.
    Polymarket,
}

impl Exchange {
    /// Returns the display name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kalshi => "Kalshi",
            Self::Polymarket => "Polymarket",
        }
    }
}

impl std::fmt::Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Market Pair (Matcher output consumed by Detector/Controller)
// =============================================================================

/// How a pair was judged equivalent by the matcher, kept for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairKind {
    /// Both titles are "up-or-down"-style 15-minute markets.
    Heuristic15m,
    /// Matched through the generic strike/title-similarity path.
    Generic,
}

/// An ordered pair `(eventK, eventP)` with a durable id.
///
/// Created by the matcher at discovery and retained while both sides are
/// open; discarded once either side's resolution time has passed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketPair {
    /// Durable id for this pair, stable across rediscovery runs.
    pub pair_id: String,
    pub event_k: MarketEvent,
    pub event_p: MarketEvent,
    pub kind: PairKind,
}

impl MarketPair {
    #[must_use]
    pub fn new(event_k: MarketEvent, event_p: MarketEvent, kind: PairKind) -> Self {
        let pair_id = format!("{}::{}", event_k.instrument_id, event_p.instrument_id);
        Self {
            pair_id,
            event_k,
            event_p,
            kind,
        }
    }

    /// True once either side's resolution time has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        let now = Utc::now();
        self.event_k.resolution_time <= now || self.event_p.resolution_time <= now
    }
}

// =============================================================================
// Trade Record (Executor output, persisted to EventLog)
// =============================================================================

/// Final outcome of a two-leg execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeOutcome {
    Filled,
    Partial,
    Aborted,
}

/// Which unwind option the executor chose for an excess leg, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnwindAction {
    Cancel,
    Hedge,
    AggressiveClose,
}

/// Append-only record of one execution attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub pair_id: String,
    pub contracts: Decimal,
    pub k_leg_cost: Decimal,
    pub p_leg_cost: Decimal,
    pub total_cost: Decimal,
    pub fees: Decimal,
    pub outcome: TradeOutcome,
    pub unwind_action: Option<UnwindAction>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl TradeRecord {
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.completed_at - self.started_at
    }
}
