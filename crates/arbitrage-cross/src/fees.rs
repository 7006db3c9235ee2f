//! Fee calculations for cross-exchange arbitrage.
//!
//! Two fee schedules are combined: a flat per-contract fee on venue P and a
//! rate applied to the traded price on venue K. This is the model the newer
//! detector in the source adopted; the older pure-rate-plus-profit-fee model
//! double-counts against the flat fee and is not used here.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Default taker fee rate on venue K (1% of traded price).
pub const DEFAULT_KALSHI_TAKER_RATE: Decimal = dec!(0.01);

/// Default flat per-contract fee on venue P.
pub const DEFAULT_POLY_FLAT_FEE: Decimal = dec!(0.001);

/// Configuration for fee calculations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Rate applied to the traded price on venue K (e.g. 0.01 for 1%).
    pub kalshi_taker_rate: Decimal,
    /// Flat fee per contract on venue P.
    pub poly_flat_fee: Decimal,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            kalshi_taker_rate: DEFAULT_KALSHI_TAKER_RATE,
            poly_flat_fee: DEFAULT_POLY_FLAT_FEE,
        }
    }
}

impl FeeConfig {
    #[must_use]
    pub fn new(kalshi_taker_rate: Decimal, poly_flat_fee: Decimal) -> Self {
        Self {
            kalshi_taker_rate,
            poly_flat_fee,
        }
    }
}

/// Computes fees for a single scenario: a venue-K leg priced at `k_price`
/// plus a flat venue-P leg fee, per contract.
#[derive(Debug, Clone, Copy)]
pub struct FeeCalculator {
    config: FeeConfig,
}

impl FeeCalculator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: FeeConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(config: FeeConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &FeeConfig {
        &self.config
    }

    /// Per-contract fee for a scenario whose venue-K leg trades at `k_price`.
    ///
    /// `fees = polyFlatFee + k_price * kalshiTakerRate`, matching the A/B
    /// scenario formulas: the NO leg fee uses `K.noAsk`, the YES leg fee uses
    /// `K.yesAsk`.
    #[must_use]
    pub fn scenario_fee(&self, k_price: Decimal) -> Decimal {
        self.config.poly_flat_fee + k_price * self.config.kalshi_taker_rate
    }
}

impl Default for FeeCalculator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_config_default() {
        let config = FeeConfig::default();
        assert_eq!(config.kalshi_taker_rate, dec!(0.01));
        assert_eq!(config.poly_flat_fee, dec!(0.001));
    }

    #[test]
    fn test_scenario_fee_basic() {
        let calc = FeeCalculator::new();
        // fee = 0.001 + 0.55 * 0.01 = 0.0065
        let fee = calc.scenario_fee(dec!(0.55));
        assert_eq!(fee, dec!(0.0065));
    }

    #[test]
    fn test_scenario_fee_zero_price() {
        let calc = FeeCalculator::new();
        let fee = calc.scenario_fee(Decimal::ZERO);
        assert_eq!(fee, dec!(0.001));
    }

    #[test]
    fn test_scenario_fee_custom_config() {
        let calc = FeeCalculator::with_config(FeeConfig::new(dec!(0.02), dec!(0.005)));
        // 0.005 + 0.40 * 0.02 = 0.013
        let fee = calc.scenario_fee(dec!(0.40));
        assert_eq!(fee, dec!(0.013));
    }

    #[test]
    fn test_fee_consistency_identity() {
        // net + gross + fees == 1.0 for a scenario priced at k=0.44, p=0.36
        let calc = FeeCalculator::new();
        let gross = dec!(0.44) + dec!(0.36);
        let fees = calc.scenario_fee(dec!(0.44));
        let net = Decimal::ONE - gross - fees;
        assert_eq!(net + gross + fees, Decimal::ONE);
    }
}
