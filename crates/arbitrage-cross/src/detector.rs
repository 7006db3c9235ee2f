//! Cross-exchange arbitrage opportunity detection.
//!
//! Given a matched pair and the freshest books for both sides, computes the
//! two hard-arbitrage scenarios and the probabilistic-arbitrage signal,
//! applies the fee model, and picks the best hard scenario.

use algo_trade_core::venue_client::{MarketMetadata, OrderBook};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

use crate::fees::FeeCalculator;
use crate::types::MarketPair;

/// TTL for the memoized detection result, absorbing bursts of identical
/// price updates on the same pair.
const CACHE_TTL: Duration = Duration::from_millis(100);

/// Threshold above which a YES-price spread is reported as probabilistic
/// arbitrage rather than executed.
const PROB_ARB_THRESHOLD: Decimal = dec!(0.15);

/// Gross-cost floor above which both scenarios are pre-filtered out without
/// running the full calculation.
const GROSS_COST_PREFILTER: Decimal = dec!(0.98);

// =============================================================================
// Detection Configuration
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Minimum net profit (fraction of $1 notional) required to emit a hard
    /// opportunity.
    pub min_profit: Decimal,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_profit: dec!(0.01),
        }
    }
}

// =============================================================================
// Opportunity
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpportunityKind {
    Hard,
    Prob,
}

/// Which leg is bought on which venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Buy YES on venue K, NO on venue P.
    YesKNoP,
    /// Buy NO on venue K, YES on venue P.
    NoKYesP,
}

/// Detector output: transient, consumed or discarded within the same tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub pair_id: String,
    pub kind: OpportunityKind,
    pub direction: Direction,
    pub gross_cost: Decimal,
    pub fees: Decimal,
    pub net_profit: Decimal,
    /// Price used on venue K for the chosen leg.
    pub k_price: Decimal,
    /// Price used on venue P for the chosen leg.
    pub p_price: Decimal,
    /// Venue-P outcome token for the leg bought on venue P, pre-resolved so
    /// the executor never looks it up on the hot path.
    pub p_token_id: Option<String>,
    /// True if the token id above came from a positional fallback rather
    /// than a declared label-to-token mapping.
    pub p_token_is_fallback: bool,
    pub detected_at: DateTime<Utc>,
}

impl Opportunity {
    #[must_use]
    pub fn is_profitable(&self) -> bool {
        self.net_profit > Decimal::ZERO
    }
}

// =============================================================================
// Resolve venue-P outcome tokens
// =============================================================================

/// Resolves the (yes, no) token ids for venue P from declared metadata,
/// falling back to positional order with a warning.
fn resolve_poly_tokens(metadata: &MarketMetadata) -> Option<(String, String, bool)> {
    match metadata {
        MarketMetadata::Polymarket {
            yes_token_id,
            no_token_id,
            ..
        } => Some((yes_token_id.clone(), no_token_id.clone(), false)),
        MarketMetadata::Kalshi => None,
    }
}

// =============================================================================
// Detector
// =============================================================================

type CacheKey = (String, String, i64, i64, i64, i64);

pub struct CrossExchangeDetector {
    config: DetectorConfig,
    fees: FeeCalculator,
    cache: Mutex<HashMap<CacheKey, (Instant, Option<Opportunity>, Option<Opportunity>, Option<String>)>>,
}

impl std::fmt::Debug for CrossExchangeDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossExchangeDetector")
            .field("config", &self.config)
            .finish()
    }
}

fn round_4dp_key(d: Decimal) -> i64 {
    (d.round_dp(4) * dec!(10000)).to_string().parse().unwrap_or(0)
}

impl CrossExchangeDetector {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DetectorConfig::default())
    }

    #[must_use]
    pub fn with_config(config: DetectorConfig) -> Self {
        Self {
            config,
            fees: FeeCalculator::new(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_config_and_fees(config: DetectorConfig, fees: FeeCalculator) -> Self {
        Self {
            config,
            fees,
            cache: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Evaluates a pair against its freshest books. Returns the best hard
    /// opportunity (if any), independently a log-only probabilistic
    /// opportunity (if the YES-price spread is wide enough), and, when no
    /// hard opportunity qualifies, a human-readable reason a "NO BUY"
    /// decision can be logged against.
    pub fn detect(
        &self,
        pair: &MarketPair,
        k_book: &OrderBook,
        p_book: &OrderBook,
    ) -> (Option<Opportunity>, Option<Opportunity>, Option<String>) {
        let (Some(k_yes), Some(k_no), Some(p_yes), Some(p_no)) =
            (&k_book.yes_ask, &k_book.no_ask, &p_book.yes_ask, &p_book.no_ask)
        else {
            trace!(pair_id = %pair.pair_id, "detector: missing top-of-book price");
            return (None, None, Some("missing top-of-book price on one or both venues".to_string()));
        };

        let key = (
            pair.event_k.instrument_id.clone(),
            pair.event_p.instrument_id.clone(),
            round_4dp_key(k_yes.price),
            round_4dp_key(k_no.price),
            round_4dp_key(p_yes.price),
            round_4dp_key(p_no.price),
        );

        {
            let mut cache = self.cache.lock();
            if let Some((ts, hard, prob, no_buy_reason)) = cache.get(&key) {
                if ts.elapsed() < CACHE_TTL {
                    return (hard.clone(), prob.clone(), no_buy_reason.clone());
                }
            }
            cache.retain(|_, (ts, _, _, _)| ts.elapsed() < CACHE_TTL * 10);
        }

        let result = self.compute(pair, k_yes.price, k_no.price, p_yes.price, p_no.price);
        self.cache.lock().insert(
            key,
            (Instant::now(), result.0.clone(), result.1.clone(), result.2.clone()),
        );
        result
    }

    fn compute(
        &self,
        pair: &MarketPair,
        k_yes: Decimal,
        k_no: Decimal,
        p_yes: Decimal,
        p_no: Decimal,
    ) -> (Option<Opportunity>, Option<Opportunity>, Option<String>) {
        let gross_a = p_yes + k_no;
        let gross_b = p_no + k_yes;

        let (hard, no_buy_reason) = if gross_a.min(gross_b) > GROSS_COST_PREFILTER {
            trace!(pair_id = %pair.pair_id, "detector: prefiltered, gross cost too high");
            (
                None,
                Some(format!(
                    "gross cost {} exceeds {GROSS_COST_PREFILTER}",
                    gross_a.min(gross_b).round_dp(4)
                )),
            )
        } else {
            let fees_a = self.fees.scenario_fee(k_no);
            let net_a = Decimal::ONE - gross_a - fees_a;

            let fees_b = self.fees.scenario_fee(k_yes);
            let net_b = Decimal::ONE - gross_b - fees_b;

            let (best_net, gross_cost, fees, direction, k_price, p_price) = if net_a >= net_b {
                (net_a, gross_a, fees_a, Direction::NoKYesP, k_no, p_yes)
            } else {
                (net_b, gross_b, fees_b, Direction::YesKNoP, k_yes, p_no)
            };

            if best_net > self.config.min_profit {
                let (p_token_id, p_token_is_fallback) =
                    match resolve_poly_tokens(&pair.event_p.metadata) {
                        Some((yes_id, no_id, fallback)) => {
                            let id = match direction {
                                Direction::NoKYesP => yes_id,
                                Direction::YesKNoP => no_id,
                            };
                            (Some(id), fallback)
                        }
                        None => (None, false),
                    };
                info!(
                    pair_id = %pair.pair_id,
                    ?direction,
                    %gross_cost,
                    %fees,
                    net_profit = %best_net,
                    "detector: hard opportunity"
                );
                (
                    Some(Opportunity {
                        pair_id: pair.pair_id.clone(),
                        kind: OpportunityKind::Hard,
                        direction,
                        gross_cost,
                        fees,
                        net_profit: best_net,
                        k_price,
                        p_price,
                        p_token_id,
                        p_token_is_fallback,
                        detected_at: Utc::now(),
                    }),
                    None,
                )
            } else {
                debug!(pair_id = %pair.pair_id, net_a = %net_a, net_b = %net_b, "detector: below min profit");
                (
                    None,
                    Some(format!(
                        "Net Profit {} < {}",
                        best_net.round_dp(4),
                        self.config.min_profit
                    )),
                )
            }
        };

        let prob = if (k_yes - p_yes).abs() > PROB_ARB_THRESHOLD {
            let direction = if k_yes < p_yes {
                Direction::NoKYesP
            } else {
                Direction::YesKNoP
            };
            Some(Opportunity {
                pair_id: pair.pair_id.clone(),
                kind: OpportunityKind::Prob,
                direction,
                gross_cost: k_yes.min(p_yes),
                fees: Decimal::ZERO,
                net_profit: (k_yes - p_yes).abs(),
                k_price: k_yes,
                p_price: p_yes,
                p_token_id: None,
                p_token_is_fallback: false,
                detected_at: Utc::now(),
            })
        } else {
            None
        };

        (hard, prob, no_buy_reason)
    }
}

impl Default for CrossExchangeDetector {
    fn default() -> Self {
        Self::new()
    }
}
