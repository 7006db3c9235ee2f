//! Append-only persistence for matched pairs, opportunities, decisions, and
//! trades.
//!
//! Writers never block the hot path: `record_*` pushes onto a bounded
//! channel and returns immediately. A single background task drains the
//! channel into SQLite. If the channel is full the record is dropped and a
//! warning logged — persistence is best-effort, the hot path is not.
//!
//! Every gating outcome on a tick — `NO BUY`, `REJECTED`, `ACCEPTED` — is
//! recorded via [`EventLog::record_decision`] into the same `opportunities`
//! table as the HARD/PROB rows from [`EventLog::record_opportunity`], so an
//! operator can reconstruct a full session from the opportunity and trade
//! tables alone, including the pairs that never reached execution.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqlitePool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::detector::{Direction, Opportunity, OpportunityKind};
use crate::types::{MarketPair, TradeRecord};

/// Non-blocking enqueue capacity. A burst beyond this is dropped, not queued.
pub const QUEUE_CAPACITY: usize = 10_000;

#[derive(Debug)]
enum Event {
    MatchedMarket(MarketPair),
    Opportunity(Opportunity),
    Decision { pair_id: String, decision: String, reason: String, at: DateTime<Utc> },
    Trade(TradeRecord),
    DailyRiskMetrics { date: DateTime<Utc>, bankroll: Decimal, daily_pnl: Decimal, exposure: Decimal },
}

/// Handle for enqueuing persistence events; cheap to clone, shared across
/// the Controller and the tasks it spawns.
#[derive(Clone)]
pub struct EventLog {
    tx: Sender<Event>,
    dropped: Arc<std::sync::atomic::AtomicU64>,
}

impl EventLog {
    /// Connects to `database_url`, runs migrations, and spawns the writer
    /// task. Dropping every clone of the returned `EventLog` closes the
    /// channel; the writer then drains the remaining queue and its
    /// `JoinHandle` resolves.
    pub async fn connect(database_url: &str) -> Result<(Self, JoinHandle<()>), sqlx::Error> {
        let pool = SqlitePool::connect(database_url).await?;
        Self::run_migrations(&pool).await?;
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let dropped = Arc::new(std::sync::atomic::AtomicU64::new(0));
        let writer = Writer { pool, rx };
        let handle = tokio::spawn(writer.run());
        Ok((Self { tx, dropped }, handle))
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS matched_markets (
                pair_id TEXT PRIMARY KEY,
                k_instrument_id TEXT NOT NULL,
                p_instrument_id TEXT NOT NULL,
                k_title TEXT NOT NULL,
                p_title TEXT NOT NULL,
                matched_at TEXT NOT NULL
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS opportunities (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                pair_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                direction TEXT,
                gross_cost TEXT,
                fees TEXT,
                net_profit TEXT,
                decision TEXT,
                reason TEXT,
                detected_at TEXT NOT NULL
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS trades (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                pair_id TEXT NOT NULL,
                contracts TEXT NOT NULL,
                k_leg_cost TEXT NOT NULL,
                p_leg_cost TEXT NOT NULL,
                total_cost TEXT NOT NULL,
                fees TEXT NOT NULL,
                outcome TEXT NOT NULL,
                unwind_action TEXT,
                started_at TEXT NOT NULL,
                completed_at TEXT NOT NULL
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS daily_risk_metrics (
                date TEXT PRIMARY KEY,
                bankroll TEXT NOT NULL,
                daily_pnl TEXT NOT NULL,
                exposure TEXT NOT NULL
            )",
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    fn enqueue(&self, event: Event) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(total_dropped = total, "event log queue full, dropping record");
            }
            Err(TrySendError::Closed(_)) => {
                warn!("event log writer has shut down, dropping record");
            }
        }
    }

    pub fn record_matched_market(&self, pair: &MarketPair) {
        self.enqueue(Event::MatchedMarket(pair.clone()));
    }

    pub fn record_opportunity(&self, opp: &Opportunity) {
        self.enqueue(Event::Opportunity(opp.clone()));
    }

    /// Records a gating decision (`NO BUY`, `REJECTED`, `ACCEPTED`) with a
    /// human-readable reason, alongside the opportunities that made it to
    /// execution. Lets an operator reconstruct the full session — including
    /// the pairs that never traded and why — from this table alone.
    pub fn record_decision(&self, pair_id: &str, decision: &str, reason: &str) {
        self.enqueue(Event::Decision {
            pair_id: pair_id.to_string(),
            decision: decision.to_string(),
            reason: reason.to_string(),
            at: Utc::now(),
        });
    }

    pub fn record_trade(&self, trade: &TradeRecord) {
        self.enqueue(Event::Trade(trade.clone()));
    }

    pub fn record_daily_risk_metrics(
        &self,
        date: DateTime<Utc>,
        bankroll: Decimal,
        daily_pnl: Decimal,
        exposure: Decimal,
    ) {
        self.enqueue(Event::DailyRiskMetrics { date, bankroll, daily_pnl, exposure });
    }

    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

struct Writer {
    pool: SqlitePool,
    rx: Receiver<Event>,
}

impl Writer {
    async fn run(mut self) {
        while let Some(event) = self.rx.recv().await {
            if let Err(e) = self.write(event).await {
                error!(error = %e, "event log write failed");
            }
        }
        info!("event log writer drained and exiting");
    }

    async fn write(&self, event: Event) -> Result<(), sqlx::Error> {
        match event {
            Event::MatchedMarket(pair) => {
                sqlx::query(
                    "INSERT OR REPLACE INTO matched_markets
                     (pair_id, k_instrument_id, p_instrument_id, k_title, p_title, matched_at)
                     VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(&pair.pair_id)
                .bind(&pair.event_k.instrument_id)
                .bind(&pair.event_p.instrument_id)
                .bind(&pair.event_k.title)
                .bind(&pair.event_p.title)
                .bind(Utc::now().to_rfc3339())
                .execute(&self.pool)
                .await?;
            }
            Event::Opportunity(opp) => {
                let kind = match opp.kind {
                    OpportunityKind::Hard => "HARD",
                    OpportunityKind::Prob => "PROB",
                };
                let direction = match opp.direction {
                    Direction::YesKNoP => "YES_K_NO_P",
                    Direction::NoKYesP => "NO_K_YES_P",
                };
                sqlx::query(
                    "INSERT INTO opportunities
                     (pair_id, kind, direction, gross_cost, fees, net_profit, decision, reason, detected_at)
                     VALUES (?, ?, ?, ?, ?, ?, NULL, NULL, ?)",
                )
                .bind(&opp.pair_id)
                .bind(kind)
                .bind(direction)
                .bind(opp.gross_cost.to_string())
                .bind(opp.fees.to_string())
                .bind(opp.net_profit.to_string())
                .bind(opp.detected_at.to_rfc3339())
                .execute(&self.pool)
                .await?;
            }
            Event::Decision { pair_id, decision, reason, at } => {
                sqlx::query(
                    "INSERT INTO opportunities
                     (pair_id, kind, direction, gross_cost, fees, net_profit, decision, reason, detected_at)
                     VALUES (?, 'DECISION', NULL, NULL, NULL, NULL, ?, ?, ?)",
                )
                .bind(&pair_id)
                .bind(&decision)
                .bind(&reason)
                .bind(at.to_rfc3339())
                .execute(&self.pool)
                .await?;
            }
            Event::Trade(trade) => {
                let outcome = format!("{:?}", trade.outcome);
                let unwind = trade.unwind_action.map(|a| format!("{a:?}"));
                sqlx::query(
                    "INSERT INTO trades
                     (pair_id, contracts, k_leg_cost, p_leg_cost, total_cost, fees, outcome,
                      unwind_action, started_at, completed_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(&trade.pair_id)
                .bind(trade.contracts.to_string())
                .bind(trade.k_leg_cost.to_string())
                .bind(trade.p_leg_cost.to_string())
                .bind(trade.total_cost.to_string())
                .bind(trade.fees.to_string())
                .bind(outcome)
                .bind(unwind)
                .bind(trade.started_at.to_rfc3339())
                .bind(trade.completed_at.to_rfc3339())
                .execute(&self.pool)
                .await?;
            }
            Event::DailyRiskMetrics { date, bankroll, daily_pnl, exposure } => {
                sqlx::query(
                    "INSERT OR REPLACE INTO daily_risk_metrics (date, bankroll, daily_pnl, exposure)
                     VALUES (?, ?, ?, ?)",
                )
                .bind(date.format("%Y-%m-%d").to_string())
                .bind(bankroll.to_string())
                .bind(daily_pnl.to_string())
                .bind(exposure.to_string())
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }
}
