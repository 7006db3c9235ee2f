//! Pre-trade risk gating and exposure tracking.
//!
//! A single mutex guards bankroll, exposure, and the kill switch so that
//! `can_execute` and the mutating calls around a trade (`register_trade`,
//! `close_position`, `update_pnl`) never race each other. Balance itself is
//! kept fresh by a background task rather than refetched on every check.

use algo_trade_core::config::RiskConfig;
use algo_trade_core::error::ErrorKind;
use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Background sync skips a re-fetch if the last one landed within this
/// window, so a hot detect loop doesn't hammer the balance endpoint.
const BALANCE_SYNC_SKIP_WINDOW: Duration = Duration::from_secs(10);

/// Interval between background balance syncs.
pub const BALANCE_SYNC_INTERVAL: Duration = Duration::from_secs(30);

struct RiskState {
    bankroll: Decimal,
    daily_pnl: Decimal,
    current_exposure: Decimal,
    kill_switch_active: bool,
    kill_switch_reason: Option<String>,
    last_reset_date: NaiveDate,
    last_balance_sync_time: Option<Instant>,
}

/// Thread-safe pre-trade risk gate. `current_bankroll` is a fallback only;
/// callers normally correct it via [`RiskGate::sync_balance`] before the
/// first check and periodically afterward.
pub struct RiskGate {
    state: Mutex<RiskState>,
    config: RiskConfig,
    shutdown: Arc<AtomicBool>,
}

impl RiskGate {
    #[must_use]
    pub fn new(current_bankroll: Decimal, config: RiskConfig) -> Self {
        Self {
            state: Mutex::new(RiskState {
                bankroll: current_bankroll,
                daily_pnl: Decimal::ZERO,
                current_exposure: Decimal::ZERO,
                kill_switch_active: false,
                kill_switch_reason: None,
                last_reset_date: Utc::now().date_naive(),
                last_balance_sync_time: None,
            }),
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Restores exposure and PnL that survived a restart (e.g. loaded from
    /// the event log). Does not touch the kill switch.
    pub fn restore_state(&self, daily_pnl: Decimal, current_exposure: Decimal) {
        let mut state = self.state.lock();
        state.daily_pnl = daily_pnl;
        state.current_exposure = current_exposure;
    }

    /// Maximum allowed total cost (both legs combined) for a single trade.
    #[must_use]
    pub fn max_trade_amount(&self) -> Decimal {
        let state = self.state.lock();
        state.bankroll * Decimal::try_from(self.config.max_risk_per_trade).unwrap_or(Decimal::ZERO)
    }

    /// Resets daily PnL/exposure tracking if the wall-clock date has rolled
    /// over since the last check. Called at the start of every
    /// [`RiskGate::can_execute`].
    fn check_daily_reset(&self) {
        let today = Utc::now().date_naive();
        let mut state = self.state.lock();
        if today > state.last_reset_date {
            info!(
                previous_pnl = %state.daily_pnl,
                previous_exposure = %state.current_exposure,
                "risk gate: daily reset"
            );
            state.daily_pnl = Decimal::ZERO;
            state.current_exposure = Decimal::ZERO;
            state.last_reset_date = today;
        }
    }

    /// Ordered risk checks: kill switch, per-trade cap, daily-loss cap
    /// (tripping the kill switch on breach), net-exposure cap.
    pub fn can_execute(&self, trade_amount: Decimal) -> Result<(), ErrorKind> {
        self.check_daily_reset();

        let mut state = self.state.lock();

        if state.kill_switch_active {
            let reason = state.kill_switch_reason.clone().unwrap_or_default();
            error!(%reason, "risk gate: kill switch active, rejecting trade");
            return Err(ErrorKind::KillSwitch(reason));
        }

        let max_trade_rate = Decimal::try_from(self.config.max_risk_per_trade).unwrap_or(Decimal::ZERO);
        let max_trade_size = state.bankroll * max_trade_rate;
        if trade_amount > max_trade_size {
            warn!(
                %trade_amount,
                %max_trade_size,
                "risk gate: trade exceeds per-trade cap"
            );
            return Err(ErrorKind::RiskRejected(format!(
                "trade amount {trade_amount} exceeds per-trade cap {max_trade_size}"
            )));
        }

        let max_loss_rate = Decimal::try_from(self.config.max_daily_loss).unwrap_or(Decimal::ZERO);
        let max_daily_loss = state.bankroll * max_loss_rate;
        if state.daily_pnl < -max_daily_loss {
            let reason = format!(
                "daily loss limit hit ({} < -{})",
                state.daily_pnl, max_daily_loss
            );
            error!(%reason, "risk gate: tripping kill switch");
            state.kill_switch_active = true;
            state.kill_switch_reason = Some(reason.clone());
            return Err(ErrorKind::KillSwitch(reason));
        }

        let max_exposure_rate = Decimal::try_from(self.config.max_net_exposure).unwrap_or(Decimal::ZERO);
        let max_exposure = state.bankroll * max_exposure_rate;
        if state.current_exposure + trade_amount > max_exposure {
            warn!(
                current_exposure = %state.current_exposure,
                %trade_amount,
                %max_exposure,
                "risk gate: net exposure cap reached"
            );
            return Err(ErrorKind::RiskRejected(format!(
                "exposure {} + trade {trade_amount} exceeds cap {max_exposure}",
                state.current_exposure
            )));
        }

        Ok(())
    }

    /// Increases tracked exposure by the full cost of a newly placed trade
    /// (including fees).
    pub fn register_trade(&self, amount: Decimal) {
        let mut state = self.state.lock();
        state.current_exposure += amount;
        info!(%amount, total_exposure = %state.current_exposure, "risk gate: trade registered");
    }

    /// Reduces tracked exposure when a position closes (settlement or
    /// unwind). Floors at zero.
    pub fn close_position(&self, amount: Decimal) {
        let mut state = self.state.lock();
        state.current_exposure = (state.current_exposure - amount).max(Decimal::ZERO);
        info!(%amount, remaining_exposure = %state.current_exposure, "risk gate: position closed");
    }

    /// Applies a realized PnL delta to both daily PnL and bankroll.
    pub fn update_pnl(&self, pnl: Decimal) {
        let mut state = self.state.lock();
        state.daily_pnl += pnl;
        state.bankroll += pnl;
        info!(%pnl, daily_pnl = %state.daily_pnl, bankroll = %state.bankroll, "risk gate: pnl updated");
    }

    /// Manually trips the kill switch. Terminal until the next restart.
    pub fn trigger_kill_switch(&self, reason: &str) {
        let mut state = self.state.lock();
        state.kill_switch_active = true;
        state.kill_switch_reason = Some(reason.to_string());
        error!(%reason, "risk gate: kill switch activated");
    }

    #[must_use]
    pub fn is_kill_switch_active(&self) -> bool {
        self.state.lock().kill_switch_active
    }

    #[must_use]
    pub fn bankroll(&self) -> Decimal {
        self.state.lock().bankroll
    }

    #[must_use]
    pub fn daily_pnl(&self) -> Decimal {
        self.state.lock().daily_pnl
    }

    #[must_use]
    pub fn current_exposure(&self) -> Decimal {
        self.state.lock().current_exposure
    }

    /// Age of the last successful balance sync, if one has happened. The
    /// Executor uses this to skip a fresh balance fetch within
    /// [`BALANCE_SYNC_SKIP_WINDOW`].
    #[must_use]
    pub fn balance_sync_age(&self) -> Option<Duration> {
        self.state.lock().last_balance_sync_time.map(|t| t.elapsed())
    }

    /// Threshold under which [`RiskGate::balance_sync_age`] is considered
    /// fresh enough to skip a new balance fetch.
    #[must_use]
    pub fn balance_sync_skip_window() -> Duration {
        BALANCE_SYNC_SKIP_WINDOW
    }

    /// Updates bankroll from a fresh external balance read, unless the last
    /// sync landed within [`BALANCE_SYNC_SKIP_WINDOW`].
    pub fn sync_balance(&self, balance: Decimal) {
        let mut state = self.state.lock();
        if let Some(last) = state.last_balance_sync_time {
            if last.elapsed() < BALANCE_SYNC_SKIP_WINDOW {
                return;
            }
        }
        info!(%balance, "risk gate: synced real balance");
        state.bankroll = balance;
        state.last_balance_sync_time = Some(Instant::now());
    }

    /// Signals the background sync task (if running) to stop after its
    /// current sleep.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Spawns a task that calls `fetch_balance` every `interval` and feeds
    /// the result into [`RiskGate::sync_balance`], until
    /// [`RiskGate::shutdown`] is called. Production call sites pass
    /// [`BALANCE_SYNC_INTERVAL`]; tests can pass a shorter one so shutdown
    /// is observed promptly.
    pub fn start_background_sync<F, Fut>(
        self: &Arc<Self>,
        interval: Duration,
        fetch_balance: F,
    ) -> tokio::task::JoinHandle<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Option<Decimal>> + Send,
    {
        let gate = Arc::clone(self);
        let shutdown = Arc::clone(&self.shutdown);
        let poll_step = Duration::from_millis(100).min(interval);
        tokio::spawn(async move {
            info!("risk gate: background balance sync started");
            while !shutdown.load(Ordering::SeqCst) {
                let mut remaining = interval;
                while remaining > Duration::ZERO && !shutdown.load(Ordering::SeqCst) {
                    let step = poll_step.min(remaining);
                    tokio::time::sleep(step).await;
                    remaining = remaining.saturating_sub(step);
                }
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                match fetch_balance().await {
                    Some(balance) => gate.sync_balance(balance),
                    None => warn!("risk gate: balance sync returned nothing, keeping cached balance"),
                }
            }
            info!("risk gate: background balance sync stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn gate(bankroll: Decimal) -> RiskGate {
        RiskGate::new(bankroll, RiskConfig::default())
    }

    #[test]
    fn test_can_execute_within_limits() {
        let gate = gate(dec!(100));
        assert!(gate.can_execute(dec!(10)).is_ok());
    }

    #[test]
    fn test_can_execute_rejects_over_per_trade_cap() {
        let gate = gate(dec!(100));
        // default max_risk_per_trade is 0.90 -> cap is $90
        let result = gate.can_execute(dec!(95));
        assert!(matches!(result, Err(ErrorKind::RiskRejected(_))));
    }

    #[test]
    fn test_kill_switch_blocks_all_trades() {
        let gate = gate(dec!(100));
        gate.trigger_kill_switch("manual stop");
        let result = gate.can_execute(dec!(1));
        assert!(matches!(result, Err(ErrorKind::KillSwitch(_))));
        assert!(gate.is_kill_switch_active());
    }

    #[test]
    fn test_daily_loss_trips_kill_switch() {
        let gate = gate(dec!(100));
        gate.update_pnl(dec!(-25)); // default max_daily_loss 0.20 -> cap $20
        let result = gate.can_execute(dec!(1));
        assert!(matches!(result, Err(ErrorKind::KillSwitch(_))));
        assert!(gate.is_kill_switch_active());
    }

    #[test]
    fn test_net_exposure_cap_rejects() {
        let gate = gate(dec!(100));
        // default max_net_exposure 0.50 -> cap $50
        gate.register_trade(dec!(45));
        let result = gate.can_execute(dec!(10));
        assert!(matches!(result, Err(ErrorKind::RiskRejected(_))));
    }

    #[test]
    fn test_close_position_frees_exposure() {
        let gate = gate(dec!(100));
        gate.register_trade(dec!(40));
        gate.close_position(dec!(40));
        assert_eq!(gate.current_exposure(), Decimal::ZERO);
    }

    #[test]
    fn test_close_position_floors_at_zero() {
        let gate = gate(dec!(100));
        gate.register_trade(dec!(10));
        gate.close_position(dec!(50));
        assert_eq!(gate.current_exposure(), Decimal::ZERO);
    }

    #[test]
    fn test_update_pnl_adjusts_bankroll_and_daily_pnl() {
        let gate = gate(dec!(100));
        gate.update_pnl(dec!(5));
        assert_eq!(gate.bankroll(), dec!(105));
        assert_eq!(gate.daily_pnl(), dec!(5));
    }

    #[test]
    fn test_sync_balance_updates_bankroll() {
        let gate = gate(dec!(100));
        gate.sync_balance(dec!(150));
        assert_eq!(gate.bankroll(), dec!(150));
    }

    #[test]
    fn test_sync_balance_skips_within_window() {
        let gate = gate(dec!(100));
        gate.sync_balance(dec!(150));
        gate.sync_balance(dec!(200));
        assert_eq!(gate.bankroll(), dec!(150));
    }

    #[test]
    fn test_max_trade_amount_scales_with_bankroll() {
        let gate = gate(dec!(200));
        assert_eq!(gate.max_trade_amount(), dec!(180));
    }

    #[tokio::test]
    async fn test_background_sync_stops_on_shutdown() {
        let gate = Arc::new(gate(dec!(100)));
        let handle = gate.start_background_sync(Duration::from_secs(30), || async { Some(dec!(1)) });
        gate.shutdown();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("background task should exit promptly after shutdown in test timing")
            .unwrap();
    }
}
