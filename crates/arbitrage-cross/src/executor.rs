//! Two-leg execution: sizing, pre-trade checks, parallel placement, fill
//! monitoring, outcome classification, and unwind of a stranded leg.

use algo_trade_core::error::ErrorKind;
use algo_trade_core::venue_client::{
    CALL_DEADLINE, MarketMetadata, OrderFillStatus, OutcomeSide, PriceLevel, Venue, VenueClient,
};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::book_cache::BookCache;
use crate::detector::{Direction, Opportunity};
use crate::fees::FeeCalculator;
use crate::risk_gate::RiskGate;
use crate::types::{MarketPair, TradeOutcome, TradeRecord, UnwindAction};

/// Exponential poll backoff for fill monitoring, totalling ~13s.
pub const FILL_POLL_BACKOFF: &[Duration] = &[
    Duration::from_millis(100),
    Duration::from_millis(200),
    Duration::from_millis(300),
    Duration::from_millis(500),
    Duration::from_secs(1),
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(2),
    Duration::from_secs(3),
    Duration::from_secs(3),
];

#[derive(Debug, Clone, Copy)]
pub struct ExecutorConfig {
    /// Venue P's minimum order value (price x contracts).
    pub min_order_value_p: Decimal,
    /// Floor below which venue K's price is treated as unusable.
    pub min_price_k: Decimal,
    pub aggressive_close_high: Decimal,
    pub aggressive_close_low: Decimal,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            min_order_value_p: dec!(1.00),
            min_price_k: dec!(0.01),
            aggressive_close_high: dec!(0.99),
            aggressive_close_low: dec!(0.01),
        }
    }
}

fn legs(direction: Direction) -> (OutcomeSide, OutcomeSide) {
    match direction {
        Direction::YesKNoP => (OutcomeSide::Yes, OutcomeSide::No),
        Direction::NoKYesP => (OutcomeSide::No, OutcomeSide::Yes),
    }
}

pub struct CrossExecutor {
    venue_k: Arc<dyn VenueClient>,
    venue_p: Arc<dyn VenueClient>,
    book_cache: Arc<BookCache>,
    risk_gate: Arc<RiskGate>,
    fees: FeeCalculator,
    config: ExecutorConfig,
}

impl CrossExecutor {
    #[must_use]
    pub fn new(
        venue_k: Arc<dyn VenueClient>,
        venue_p: Arc<dyn VenueClient>,
        book_cache: Arc<BookCache>,
        risk_gate: Arc<RiskGate>,
    ) -> Self {
        Self {
            venue_k,
            venue_p,
            book_cache,
            risk_gate,
            fees: FeeCalculator::new(),
            config: ExecutorConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_fees(mut self, fees: FeeCalculator) -> Self {
        self.fees = fees;
        self
    }

    fn venue_client(&self, venue: Venue) -> &Arc<dyn VenueClient> {
        match venue {
            Venue::K => &self.venue_k,
            Venue::P => &self.venue_p,
        }
    }

    async fn fetch_book_side(
        &self,
        venue: Venue,
        instrument_id: &str,
        side: OutcomeSide,
    ) -> Result<PriceLevel, ErrorKind> {
        let book = match self.book_cache.get(venue, instrument_id) {
            Ok(Some(book)) => book,
            Ok(None) | Err(ErrorKind::Stale(_)) => {
                tokio::time::timeout(
                    CALL_DEADLINE,
                    self.venue_client(venue).top_of_book(instrument_id),
                )
                .await
                .map_err(|_| ErrorKind::Transient(format!("{venue} top_of_book timed out")))??
                .ok_or_else(|| ErrorKind::NoLiquidity(format!("{venue}:{instrument_id} has no book")))?
            }
            Err(other) => return Err(other),
        };
        let level = match side {
            OutcomeSide::Yes => book.yes_ask,
            OutcomeSide::No => book.no_ask,
        };
        level.ok_or_else(|| ErrorKind::NoLiquidity(format!("{venue}:{instrument_id} has no {side:?} ask")))
    }

    async fn fetch_balance(&self) -> Option<Decimal> {
        if let Some(age) = self.risk_gate.balance_sync_age() {
            if age < RiskGate::balance_sync_skip_window() {
                return Some(self.risk_gate.bankroll());
            }
        }
        match tokio::time::timeout(CALL_DEADLINE, self.venue_k.balance()).await {
            Ok(Ok(balance)) => balance,
            Ok(Err(e)) => {
                warn!(error = %e, "executor: balance fetch failed, using cached bankroll");
                Some(self.risk_gate.bankroll())
            }
            Err(_) => {
                warn!("executor: balance fetch timed out, using cached bankroll");
                Some(self.risk_gate.bankroll())
            }
        }
    }

    /// Runs the full two-leg protocol for `opp` against `pair`. Returns a
    /// `TradeRecord` for every outcome, including aborts — only a hard
    /// sizing/liquidity/price failure before any order is placed returns
    /// `Err` instead.
    pub async fn execute(
        &self,
        pair: &MarketPair,
        opp: &Opportunity,
    ) -> Result<TradeRecord, ErrorKind> {
        let started_at = Utc::now();
        let (k_side, p_side) = legs(opp.direction);

        // 1. Sizing.
        let max_total = self.risk_gate.max_trade_amount();
        let unit = opp.k_price + opp.p_price;
        if unit <= Decimal::ZERO {
            return Err(ErrorKind::BadPrice("unit price is non-positive".to_string()));
        }
        let mut contracts = (max_total / unit).floor();
        if opp.p_price > Decimal::ZERO && opp.p_price * contracts < self.config.min_order_value_p {
            let needed = (self.config.min_order_value_p / opp.p_price).ceil();
            if needed * unit > max_total {
                return Err(ErrorKind::BelowMinOrder(format!(
                    "raising to {needed} contracts would exceed max trade amount {max_total}"
                )));
            }
            contracts = needed;
        }
        if contracts < Decimal::ONE {
            return Err(ErrorKind::BelowMinOrder("sized to fewer than 1 contract".to_string()));
        }

        // 2. Pre-trade data fetch, parallel.
        let (k_level, p_level, balance) = tokio::join!(
            self.fetch_book_side(Venue::K, &pair.event_k.instrument_id, k_side),
            self.fetch_book_side(Venue::P, &pair.event_p.instrument_id, p_side),
            self.fetch_balance(),
        );
        let k_level = k_level?;
        let p_level = p_level?;

        // 3. Liquidity & price check.
        if k_level.size < contracts || p_level.size < contracts {
            return Err(ErrorKind::NoLiquidity(format!(
                "insufficient depth: k={} p={} need={contracts}",
                k_level.size, p_level.size
            )));
        }
        if k_level.price <= Decimal::ZERO || k_level.price <= self.config.min_price_k {
            return Err(ErrorKind::BadPrice(format!("venue K price {} too low", k_level.price)));
        }
        if p_level.price <= Decimal::ZERO {
            return Err(ErrorKind::BadPrice(format!("venue P price {} is non-positive", p_level.price)));
        }

        // 4. Balance check.
        let k_leg_cost = k_level.price * contracts;
        let p_leg_cost = p_level.price * contracts;
        let fees = self.fees.scenario_fee(k_level.price) * contracts;
        let total_cost = k_leg_cost + p_leg_cost + fees;

        if let Some(balance) = balance {
            if balance < k_leg_cost {
                return Err(ErrorKind::NoLiquidity(format!(
                    "venue K balance {balance} insufficient for leg cost {k_leg_cost}"
                )));
            }
        }
        self.risk_gate.can_execute(total_cost)?;

        // 5. Parallel placement.
        let k_id = self.venue_k.place_order(
            &pair.event_k.instrument_id,
            k_side,
            contracts,
            k_level.price,
            &MarketMetadata::Kalshi,
        );
        let p_id = self.venue_p.place_order(
            &pair.event_p.instrument_id,
            p_side,
            contracts,
            p_level.price,
            &pair.event_p.metadata,
        );
        let (k_order, p_order) = tokio::join!(k_id, p_id);

        let (k_order_id, p_order_id) = match (k_order, p_order) {
            (Ok(k), Ok(p)) => (Some(k), Some(p)),
            (Ok(k), Err(e)) => {
                warn!(error = %e, "executor: venue P placement failed after venue K succeeded");
                (Some(k), None)
            }
            (Err(e), Ok(p)) => {
                warn!(error = %e, "executor: venue K placement failed after venue P succeeded");
                (None, Some(p))
            }
            (Err(ek), Err(ep)) => {
                error!(k_error = %ek, p_error = %ep, "executor: both legs failed to place");
                return Ok(TradeRecord {
                    pair_id: pair.pair_id.clone(),
                    contracts: Decimal::ZERO,
                    k_leg_cost: Decimal::ZERO,
                    p_leg_cost: Decimal::ZERO,
                    total_cost: Decimal::ZERO,
                    fees: Decimal::ZERO,
                    outcome: TradeOutcome::Aborted,
                    unwind_action: None,
                    started_at,
                    completed_at: Utc::now(),
                });
            }
        };

        self.risk_gate.register_trade(total_cost);

        // 6. Fill monitoring with exponential backoff.
        let (k_state, p_state) = self
            .monitor_fills(k_order_id.as_deref(), p_order_id.as_deref())
            .await;

        // 7. Outcome classification.
        let k_filled = k_state.as_ref().map(|s| s.filled_size).unwrap_or(Decimal::ZERO);
        let p_filled = p_state.as_ref().map(|s| s.filled_size).unwrap_or(Decimal::ZERO);

        if k_filled >= contracts && p_filled >= contracts {
            info!(pair_id = %pair.pair_id, %contracts, %total_cost, "executor: both legs fully filled");
            return Ok(TradeRecord {
                pair_id: pair.pair_id.clone(),
                contracts,
                k_leg_cost,
                p_leg_cost,
                total_cost,
                fees,
                outcome: TradeOutcome::Filled,
                unwind_action: None,
                started_at,
                completed_at: Utc::now(),
            });
        }

        if k_filled <= Decimal::ZERO && p_filled <= Decimal::ZERO {
            self.risk_gate.close_position(total_cost);
            warn!(pair_id = %pair.pair_id, "executor: neither leg filled, aborting");
            return Ok(TradeRecord {
                pair_id: pair.pair_id.clone(),
                contracts: Decimal::ZERO,
                k_leg_cost: Decimal::ZERO,
                p_leg_cost: Decimal::ZERO,
                total_cost: Decimal::ZERO,
                fees: Decimal::ZERO,
                outcome: TradeOutcome::Aborted,
                unwind_action: None,
                started_at,
                completed_at: Utc::now(),
            });
        }

        let matched = k_filled.min(p_filled);
        let (excess_venue, excess_side, excess_qty, excess_order_id) = if k_filled > p_filled {
            (Venue::K, k_side, k_filled - p_filled, k_order_id)
        } else {
            (Venue::P, p_side, p_filled - k_filled, p_order_id)
        };

        let unwind_action = self
            .unwind(pair, excess_venue, excess_side, excess_qty, excess_order_id.as_deref())
            .await;

        let matched_cost = matched * (k_level.price + p_level.price);
        self.risk_gate.close_position(total_cost - matched_cost);

        info!(
            pair_id = %pair.pair_id,
            %matched,
            ?unwind_action,
            "executor: partial fill unwound"
        );

        Ok(TradeRecord {
            pair_id: pair.pair_id.clone(),
            contracts: matched,
            k_leg_cost: matched * k_level.price,
            p_leg_cost: matched * p_level.price,
            total_cost: matched_cost + fees,
            fees,
            outcome: TradeOutcome::Partial,
            unwind_action: Some(unwind_action),
            started_at,
            completed_at: Utc::now(),
        })
    }

    async fn monitor_fills(
        &self,
        k_order_id: Option<&str>,
        p_order_id: Option<&str>,
    ) -> (
        Option<algo_trade_core::venue_client::OrderState>,
        Option<algo_trade_core::venue_client::OrderState>,
    ) {
        let mut k_state = None;
        let mut p_state = None;

        for delay in FILL_POLL_BACKOFF {
            tokio::time::sleep(*delay).await;

            if let Some(id) = k_order_id {
                if let Ok(state) = self.venue_k.query_order(id).await {
                    k_state = Some(state);
                }
            }
            if let Some(id) = p_order_id {
                if let Ok(state) = self.venue_p.query_order(id).await {
                    p_state = Some(state);
                }
            }

            let k_done = k_order_id.is_none()
                || k_state.as_ref().map(|s| s.status.is_terminal()).unwrap_or(false);
            let p_done = p_order_id.is_none()
                || p_state.as_ref().map(|s| s.status.is_terminal()).unwrap_or(false);
            if k_done && p_done {
                break;
            }
        }

        (k_state, p_state)
    }

    /// Picks the cheapest of Cancel/Hedge/Aggressive-close for the excess
    /// leg and submits it, falling back to aggressive close on failure.
    async fn unwind(
        &self,
        pair: &MarketPair,
        venue: Venue,
        side_held: OutcomeSide,
        qty: Decimal,
        order_id: Option<&str>,
    ) -> UnwindAction {
        let instrument_id = match venue {
            Venue::K => &pair.event_k.instrument_id,
            Venue::P => &pair.event_p.instrument_id,
        };
        let kalshi_metadata = MarketMetadata::Kalshi;
        let metadata = match venue {
            Venue::K => &kalshi_metadata,
            Venue::P => &pair.event_p.metadata,
        };

        if let Some(id) = order_id {
            if let Ok(state) = self.venue_client(venue).query_order(id).await {
                if !state.status.is_terminal() && self.venue_client(venue).cancel_order(id).await.is_ok() {
                    info!(%venue, "executor: unwind via cancel");
                    return UnwindAction::Cancel;
                }
            }
        }

        let opposite = match side_held {
            OutcomeSide::Yes => OutcomeSide::No,
            OutcomeSide::No => OutcomeSide::Yes,
        };

        let hedge_level = self
            .venue_client(venue)
            .top_of_book(instrument_id)
            .await
            .ok()
            .flatten()
            .and_then(|book| match opposite {
                OutcomeSide::Yes => book.yes_ask,
                OutcomeSide::No => book.no_ask,
            });

        let hedge_cost = hedge_level
            .filter(|level| level.size >= qty)
            .map(|level| level.price * qty + self.fees.scenario_fee(level.price) * qty);

        let aggressive_price = match side_held {
            OutcomeSide::Yes => self.config.aggressive_close_low,
            OutcomeSide::No => self.config.aggressive_close_high,
        };
        let aggressive_cost = aggressive_price * qty + self.fees.scenario_fee(aggressive_price) * qty;

        let try_hedge = hedge_cost.map(|c| c <= aggressive_cost).unwrap_or(false);

        if try_hedge {
            if let Some(level) = hedge_level {
                let result = self
                    .venue_client(venue)
                    .place_order(instrument_id, opposite, qty, level.price, metadata)
                    .await;
                if result.is_ok() {
                    info!(%venue, "executor: unwind via hedge");
                    return UnwindAction::Hedge;
                }
                warn!(%venue, "executor: hedge failed, falling back to aggressive close");
            }
        }

        match self
            .venue_client(venue)
            .place_order(instrument_id, opposite, qty, aggressive_price, metadata)
            .await
        {
            Ok(_) => info!(%venue, "executor: unwind via aggressive close"),
            Err(e) => error!(%venue, error = %e, "executor: aggressive close unwind failed"),
        }
        UnwindAction::AggressiveClose
    }
}
