//! Layered configuration for the cross-venue arbitrage bot.
//!
//! Credentials are never part of this struct — they are read from the
//! environment directly by each venue client at startup, and the loader
//! refuses to start in live mode if they are absent (`ConfigInvalid`).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_simulation_mode")]
    pub simulation_mode: bool,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub fees: FeeConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
}

fn default_simulation_mode() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://arbitrage.db".to_string(),
        }
    }
}

/// Fee model: a flat per-contract fee on venue P, a taker rate on venue K.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeConfig {
    pub kalshi_taker_rate: f64,
    pub poly_flat_fee: f64,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            kalshi_taker_rate: 0.01,
            poly_flat_fee: 0.001,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Fraction of bankroll risked per trade.
    pub max_risk_per_trade: f64,
    /// Fraction of bankroll that trips the kill switch for the day.
    pub max_daily_loss: f64,
    /// Fraction of bankroll allowed as open exposure at once.
    pub max_net_exposure: f64,
    /// Minimum net profit (probability units) required to act on an opportunity.
    pub min_profit: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_risk_per_trade: 0.90,
            max_daily_loss: 0.20,
            max_net_exposure: 0.50,
            min_profit: 0.01,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub cooldown_seconds: u64,
    pub book_freshness_ms: u64,
    pub detect_cache_ms: u64,
    pub balance_sync_seconds: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            cooldown_seconds: 60,
            book_freshness_ms: 500,
            detect_cache_ms: 100,
            balance_sync_seconds: 30,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            simulation_mode: true,
            database: DatabaseConfig::default(),
            fees: FeeConfig::default(),
            risk: RiskConfig::default(),
            controller: ControllerConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_start_in_simulation_mode() {
        let config = AppConfig::default();
        assert!(config.simulation_mode);
    }

    #[test]
    fn default_risk_limits_match_spec_defaults() {
        let risk = RiskConfig::default();
        assert!((risk.max_risk_per_trade - 0.90).abs() < f64::EPSILON);
        assert!((risk.max_daily_loss - 0.20).abs() < f64::EPSILON);
        assert!((risk.max_net_exposure - 0.50).abs() < f64::EPSILON);
        assert!((risk.min_profit - 0.01).abs() < f64::EPSILON);
    }
}
