//! Orchestrates discovery, subscription, detection, and execution.
//!
//! Owns the authoritative pair set and the cooldown clock. BookCache and
//! RiskGate hold no references back to pairs — everything is keyed by
//! stable ids, never pointers, so there's no ownership cycle to untangle.

use algo_trade_core::error::ErrorKind;
use algo_trade_core::venue_client::{
    BookUpdate, DiscoveryFilter, MarketEvent, OrderBook, Venue, VenueClient,
};
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::book_cache::BookCache;
use crate::detector::CrossExchangeDetector;
use crate::event_log::EventLog;
use crate::executor::CrossExecutor;
use crate::matcher::match_events;
use crate::risk_gate::RiskGate;
use crate::types::MarketPair;

/// Known asset keywords used to filter discovery candidates.
const ASSET_KEYWORDS: [&str; 3] = ["BTC", "ETH", "SOL"];

/// Pairs resolving further out than this are not worth tracking yet.
const MAX_RESOLUTION_HORIZON_SECS: i64 = 24 * 3600;

/// Per-pair cooldown after an execution attempt before it can fire again.
/// Not operator-configurable: SPEC_FULL.md fixes this at 15s, distinct from
/// the global, config-driven cooldown below.
const PAIR_COOLDOWN: Duration = Duration::from_secs(15);

/// Default global cooldown after any execution attempt, before the next
/// discovery. Overridable via `ControllerConfig::cooldown_seconds`.
const DEFAULT_GLOBAL_COOLDOWN: Duration = Duration::from_secs(60);

/// Prices outside this band carry no arbitrage headroom; the pair is
/// rejected before ever reaching the Executor.
const TRADABLE_PRICE_BAND: (Decimal, Decimal) = (dec!(0.10), dec!(0.90));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairState {
    Discovered,
    Subscribed,
    Monitoring,
    Detected,
    Executing,
    Cooldown,
    Expired,
}

struct TrackedPair {
    pair: MarketPair,
    state: PairState,
    cooldown_until: Option<Instant>,
}

pub struct Controller {
    venue_k: Arc<dyn VenueClient>,
    venue_p: Arc<dyn VenueClient>,
    book_cache: Arc<BookCache>,
    risk_gate: Arc<RiskGate>,
    detector: Arc<CrossExchangeDetector>,
    executor: Arc<CrossExecutor>,
    event_log: Arc<EventLog>,
    pairs: Mutex<HashMap<String, TrackedPair>>,
    global_cooldown_until: Mutex<Option<Instant>>,
    global_cooldown: Duration,
    shutdown: Arc<AtomicBool>,
}

impl Controller {
    #[must_use]
    pub fn new(
        venue_k: Arc<dyn VenueClient>,
        venue_p: Arc<dyn VenueClient>,
        book_cache: Arc<BookCache>,
        risk_gate: Arc<RiskGate>,
        detector: Arc<CrossExchangeDetector>,
        executor: Arc<CrossExecutor>,
        event_log: Arc<EventLog>,
    ) -> Self {
        Self::with_global_cooldown(
            venue_k,
            venue_p,
            book_cache,
            risk_gate,
            detector,
            executor,
            event_log,
            DEFAULT_GLOBAL_COOLDOWN,
        )
    }

    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn with_global_cooldown(
        venue_k: Arc<dyn VenueClient>,
        venue_p: Arc<dyn VenueClient>,
        book_cache: Arc<BookCache>,
        risk_gate: Arc<RiskGate>,
        detector: Arc<CrossExchangeDetector>,
        executor: Arc<CrossExecutor>,
        event_log: Arc<EventLog>,
        global_cooldown: Duration,
    ) -> Self {
        Self {
            venue_k,
            venue_p,
            book_cache,
            risk_gate,
            detector,
            executor,
            event_log,
            pairs: Mutex::new(HashMap::new()),
            global_cooldown_until: Mutex::new(None),
            global_cooldown,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn active_pair_count(&self) -> usize {
        self.pairs.lock().len()
    }

    /// Discovers candidates on both venues, matches the cross product,
    /// drops expired or far-out pairs, validates venue-P tokens, and
    /// merges survivors into the tracked set. Idempotent: rerunning with no
    /// upstream changes yields the same pair set.
    pub async fn discover(&self) -> Result<usize, ErrorKind> {
        let filter = DiscoveryFilter {
            asset_keywords: ASSET_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            max_resolution_secs: Some(MAX_RESOLUTION_HORIZON_SECS),
        };

        let (k_events, p_events) =
            tokio::join!(self.venue_k.discover(&filter), self.venue_p.discover(&filter));
        let k_events = k_events?;
        let p_events = p_events?;

        let mut new_pairs = Vec::new();
        for k in &k_events {
            for p in &p_events {
                if let Some(pair) = match_events(k, p) {
                    if pair.is_expired() {
                        continue;
                    }
                    new_pairs.push(pair);
                }
            }
        }

        let mut validated = Vec::new();
        for pair in new_pairs {
            match self.venue_p.top_of_book(&pair.event_p.instrument_id).await {
                Ok(Some(_)) => validated.push(pair),
                Ok(None) => {
                    warn!(pair_id = %pair.pair_id, "controller: venue P token has no book, dropping pair");
                }
                Err(e) => {
                    warn!(pair_id = %pair.pair_id, error = %e, "controller: venue P token validation failed, dropping pair");
                }
            }
        }

        let mut pairs = self.pairs.lock();
        let mut added = 0;
        for pair in validated {
            if !pairs.contains_key(&pair.pair_id) {
                added += 1;
                self.event_log.record_matched_market(&pair);
                pairs.insert(
                    pair.pair_id.clone(),
                    TrackedPair { pair, state: PairState::Discovered, cooldown_until: None },
                );
            }
        }
        Ok(added)
    }

    /// Subscribes the stream for every tracked pair not yet subscribed.
    /// Returns the receivers so the caller can spawn per-venue reader tasks.
    pub async fn subscribe_all(
        &self,
    ) -> Result<
        (
            tokio::sync::mpsc::Receiver<BookUpdate>,
            tokio::sync::mpsc::Receiver<BookUpdate>,
        ),
        ErrorKind,
    > {
        let (k_ids, p_ids): (Vec<String>, Vec<String>) = {
            let mut pairs = self.pairs.lock();
            let mut k_ids = Vec::new();
            let mut p_ids = Vec::new();
            for tracked in pairs.values_mut() {
                if tracked.state == PairState::Discovered {
                    tracked.state = PairState::Subscribed;
                }
                k_ids.push(tracked.pair.event_k.instrument_id.clone());
                p_ids.push(tracked.pair.event_p.instrument_id.clone());
            }
            (k_ids, p_ids)
        };
        let k_rx = self.venue_k.subscribe(&k_ids).await?;
        let p_rx = self.venue_p.subscribe(&p_ids).await?;
        Ok((k_rx, p_rx))
    }

    /// Applies a book update from either venue's stream reader.
    pub fn on_book_update(&self, venue: Venue, update: BookUpdate) {
        self.book_cache.update(venue, update.book);
    }

    fn in_global_cooldown(&self) -> bool {
        match *self.global_cooldown_until.lock() {
            Some(until) => Instant::now() < until,
            None => false,
        }
    }

    fn in_pair_cooldown(&self, pair_id: &str) -> bool {
        self.pairs
            .lock()
            .get(pair_id)
            .and_then(|t| t.cooldown_until)
            .map(|until| Instant::now() < until)
            .unwrap_or(false)
    }

    /// Tradability filter: reject if any of the four raw prices lies
    /// outside `[0.10, 0.90]` — an extreme probability leaves no
    /// arbitrage headroom worth the execution risk. Checked against the
    /// live books already fetched for this tick, not the `MarketEvent`
    /// snapshot frozen at discovery time.
    fn is_tradable(k_book: &OrderBook, p_book: &OrderBook) -> Result<(), String> {
        let (lo, hi) = TRADABLE_PRICE_BAND;
        let checks = [
            ("Kalshi YES", k_book.yes_ask.as_ref()),
            ("Kalshi NO", k_book.no_ask.as_ref()),
            ("Polymarket YES", p_book.yes_ask.as_ref()),
            ("Polymarket NO", p_book.no_ask.as_ref()),
        ];
        for (label, level) in checks {
            if let Some(level) = level {
                let pct = level.price * dec!(100);
                if level.price > hi {
                    return Err(format!("{label} too high ({pct:.1}%)"));
                }
                if level.price < lo {
                    return Err(format!("{label} too low ({pct:.1}%)"));
                }
            }
        }
        Ok(())
    }

    /// One hot-path tick: for every active, non-cooling-down pair with
    /// fresh books on both sides, runs Detector, applies the tradability
    /// filter, and executes qualifying opportunities. Returns the number of
    /// execution attempts made.
    pub async fn tick(&self) -> usize {
        if self.in_global_cooldown() || self.risk_gate.is_kill_switch_active() {
            return 0;
        }

        let snapshot: Vec<MarketPair> = self
            .pairs
            .lock()
            .values()
            .filter(|t| t.state != PairState::Expired)
            .map(|t| t.pair.clone())
            .collect();

        let mut attempts = 0;
        for pair in snapshot {
            if pair.is_expired() {
                self.mark_expired(&pair.pair_id);
                continue;
            }
            if self.in_pair_cooldown(&pair.pair_id) {
                continue;
            }

            let k_book = self.book_cache.get(Venue::K, &pair.event_k.instrument_id);
            let p_book = self.book_cache.get(Venue::P, &pair.event_p.instrument_id);
            let (Ok(Some(k_book)), Ok(Some(p_book))) = (k_book, p_book) else {
                continue;
            };

            let (hard, prob, no_buy_reason) = self.detector.detect(&pair, &k_book, &p_book);
            if let Some(prob_opp) = &prob {
                self.event_log.record_opportunity(prob_opp);
            }
            let Some(opp) = hard else {
                let reason = no_buy_reason.unwrap_or_else(|| "no qualifying opportunity".to_string());
                self.event_log.record_decision(&pair.pair_id, "NO BUY", &reason);
                continue;
            };
            self.event_log.record_opportunity(&opp);

            if let Err(reason) = Self::is_tradable(&k_book, &p_book) {
                info!(pair_id = %pair.pair_id, %reason, "controller: rejected at tradability filter");
                self.event_log.record_decision(&pair.pair_id, "REJECTED", &reason);
                continue;
            }

            self.event_log.record_decision(
                &pair.pair_id,
                "ACCEPTED",
                &format!("net profit {} >= {}", opp.net_profit, self.detector.config().min_profit),
            );
            info!(pair_id = %pair.pair_id, net_profit = %opp.net_profit, "controller: executing opportunity");
            attempts += 1;
            match self.executor.execute(&pair, &opp).await {
                Ok(record) => {
                    info!(pair_id = %pair.pair_id, outcome = ?record.outcome, "controller: execution attempt finished");
                    self.event_log.record_trade(&record);
                }
                Err(e) => {
                    warn!(pair_id = %pair.pair_id, error = %e, "controller: execution attempt failed");
                }
            }
            self.enter_cooldown(&pair.pair_id);
        }

        attempts
    }

    fn enter_cooldown(&self, pair_id: &str) {
        let mut pairs = self.pairs.lock();
        if let Some(tracked) = pairs.get_mut(pair_id) {
            tracked.state = PairState::Cooldown;
            tracked.cooldown_until = Some(Instant::now() + PAIR_COOLDOWN);
        }
        drop(pairs);
        *self.global_cooldown_until.lock() = Some(Instant::now() + self.global_cooldown);
    }

    fn mark_expired(&self, pair_id: &str) {
        let mut pairs = self.pairs.lock();
        if let Some(tracked) = pairs.get_mut(pair_id) {
            tracked.state = PairState::Expired;
        }
    }

    /// Drives discovery, the hot-path tick loop, and periodic rediscovery
    /// until shutdown. Book updates arrive out-of-band via `on_book_update`
    /// (called from each venue's stream-reader task); this loop only drives
    /// the tick cadence and rediscovery.
    pub async fn run(&self, tick_interval: Duration, rediscover_interval: Duration) {
        if let Err(e) = self.discover().await {
            warn!(error = %e, "controller: initial discovery failed");
        }
        let mut last_discovery = Instant::now();

        while !self.is_shutdown() {
            self.tick().await;

            if last_discovery.elapsed() >= rediscover_interval {
                if let Err(e) = self.discover().await {
                    warn!(error = %e, "controller: rediscovery failed, retrying next cycle");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
                last_discovery = Instant::now();
            }

            tokio::time::sleep(tick_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk_gate::RiskGate;
    use algo_trade_core::config::RiskConfig;
    use algo_trade_core::test_support::{InMemoryVenueClient, ScriptedFill};
    use algo_trade_core::venue_client::{MarketMetadata, OrderBook, PriceLevel};

    fn event(venue: Venue, id: &str, title: &str, resolution_secs: i64) -> MarketEvent {
        MarketEvent {
            venue,
            instrument_id: id.to_string(),
            venue_ticker: id.to_string(),
            title: title.to_string(),
            resolution_time: Utc::now() + chrono::Duration::seconds(resolution_secs),
            yes_ask: Some(dec!(0.44)),
            no_ask: Some(dec!(0.55)),
            cumulative_volume: Decimal::ZERO,
            resolution_source: "coinbase".to_string(),
            metadata: if venue == Venue::P {
                MarketMetadata::Polymarket {
                    yes_token_id: "yes-tok".to_string(),
                    no_token_id: "no-tok".to_string(),
                    neg_risk: true,
                }
            } else {
                MarketMetadata::Kalshi
            },
        }
    }

    fn book(instrument_id: &str, yes_ask: Decimal, no_ask: Decimal) -> OrderBook {
        OrderBook {
            instrument_id: instrument_id.to_string(),
            yes_bid: None,
            yes_ask: Some(PriceLevel { price: yes_ask, size: dec!(1000) }),
            no_bid: None,
            no_ask: Some(PriceLevel { price: no_ask, size: dec!(1000) }),
            updated_at: Utc::now(),
        }
    }

    async fn controller() -> (Controller, Arc<InMemoryVenueClient>, Arc<InMemoryVenueClient>) {
        let venue_k = InMemoryVenueClient::new(Venue::K);
        let venue_p = InMemoryVenueClient::new(Venue::P);
        let book_cache = Arc::new(BookCache::new());
        let risk_gate = Arc::new(RiskGate::new(dec!(1000), RiskConfig::default()));
        let detector = Arc::new(CrossExchangeDetector::new());
        let executor = Arc::new(CrossExecutor::new(
            venue_k.clone() as Arc<dyn VenueClient>,
            venue_p.clone() as Arc<dyn VenueClient>,
            book_cache.clone(),
            risk_gate.clone(),
        ));
        let (event_log, _handle) = EventLog::connect("sqlite::memory:").await.unwrap();
        let controller = Controller::new(
            venue_k.clone() as Arc<dyn VenueClient>,
            venue_p.clone() as Arc<dyn VenueClient>,
            book_cache,
            risk_gate,
            detector,
            executor,
            Arc::new(event_log),
        );
        (controller, venue_k, venue_p)
    }

    #[tokio::test]
    async fn test_discover_matches_and_tracks_pair() {
        let (controller, venue_k, venue_p) = controller().await;
        venue_k.set_discoverable(vec![event(Venue::K, "k1", "BTC up or down 3pm", 900)]);
        venue_p.set_discoverable(vec![event(Venue::P, "p1", "BTC up or down 3pm", 900)]);
        venue_p.set_book("p1", book("p1", dec!(0.36), dec!(0.63)));

        let added = controller.discover().await.unwrap();
        assert_eq!(added, 1);
        assert_eq!(controller.active_pair_count(), 1);
    }

    #[tokio::test]
    async fn test_discover_is_idempotent() {
        let (controller, venue_k, venue_p) = controller().await;
        venue_k.set_discoverable(vec![event(Venue::K, "k1", "BTC up or down 3pm", 900)]);
        venue_p.set_discoverable(vec![event(Venue::P, "p1", "BTC up or down 3pm", 900)]);
        venue_p.set_book("p1", book("p1", dec!(0.36), dec!(0.63)));

        controller.discover().await.unwrap();
        controller.discover().await.unwrap();
        assert_eq!(controller.active_pair_count(), 1);
    }

    #[tokio::test]
    async fn test_discover_drops_pair_with_no_p_book() {
        let (controller, venue_k, venue_p) = controller().await;
        venue_k.set_discoverable(vec![event(Venue::K, "k1", "BTC up or down 3pm", 900)]);
        venue_p.set_discoverable(vec![event(Venue::P, "p1", "BTC up or down 3pm", 900)]);
        // no book registered for p1

        controller.discover().await.unwrap();
        assert_eq!(controller.active_pair_count(), 0);
    }

    #[tokio::test]
    async fn test_tick_skips_without_fresh_books() {
        let (controller, venue_k, venue_p) = controller().await;
        venue_k.set_discoverable(vec![event(Venue::K, "k1", "BTC up or down 3pm", 900)]);
        venue_p.set_discoverable(vec![event(Venue::P, "p1", "BTC up or down 3pm", 900)]);
        venue_p.set_book("p1", book("p1", dec!(0.36), dec!(0.63)));
        controller.discover().await.unwrap();

        let attempts = controller.tick().await;
        assert_eq!(attempts, 0);
    }

    #[tokio::test]
    async fn test_tick_executes_on_clear_arb() {
        let (controller, venue_k, venue_p) = controller().await;
        venue_k.set_discoverable(vec![event(Venue::K, "k1", "BTC up or down 3pm", 900)]);
        venue_p.set_discoverable(vec![event(Venue::P, "p1", "BTC up or down 3pm", 900)]);
        venue_p.set_book("p1", book("p1", dec!(0.36), dec!(0.63)));
        venue_k.set_balance(Some(dec!(1000)));
        venue_k.set_next_fill_script(ScriptedFill::ImmediateFill);
        venue_p.set_next_fill_script(ScriptedFill::ImmediateFill);
        controller.discover().await.unwrap();

        controller.on_book_update(
            Venue::K,
            BookUpdate { instrument_id: "k1".to_string(), book: book("k1", dec!(0.44), dec!(0.55)) },
        );
        controller.on_book_update(
            Venue::P,
            BookUpdate { instrument_id: "p1".to_string(), book: book("p1", dec!(0.36), dec!(0.63)) },
        );

        let attempts = controller.tick().await;
        assert_eq!(attempts, 1);
    }

    #[tokio::test]
    async fn test_tradability_filter_rejects_extreme_price() {
        let k_book = book("k1", dec!(0.44), dec!(0.55));
        let extreme_p_book = book("p1", dec!(0.95), dec!(0.63));
        let result = Controller::is_tradable(&k_book, &extreme_p_book);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_tradability_filter_checks_live_book_not_stale_snapshot() {
        // The discovery-time MarketEvent snapshot never updates after a pair
        // is tracked; the filter must reject based on the live book, not it.
        let k_book = book("k1", dec!(0.95), dec!(0.55));
        let p_book = book("p1", dec!(0.36), dec!(0.63));
        let result = Controller::is_tradable(&k_book, &p_book);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("too high"));
    }

    #[tokio::test]
    async fn test_global_cooldown_blocks_further_ticks() {
        let (controller, venue_k, venue_p) = controller().await;
        venue_k.set_discoverable(vec![event(Venue::K, "k1", "BTC up or down 3pm", 900)]);
        venue_p.set_discoverable(vec![event(Venue::P, "p1", "BTC up or down 3pm", 900)]);
        venue_p.set_book("p1", book("p1", dec!(0.36), dec!(0.63)));
        venue_k.set_balance(Some(dec!(1000)));
        venue_k.set_next_fill_script(ScriptedFill::ImmediateFill);
        venue_p.set_next_fill_script(ScriptedFill::ImmediateFill);
        controller.discover().await.unwrap();
        controller.on_book_update(
            Venue::K,
            BookUpdate { instrument_id: "k1".to_string(), book: book("k1", dec!(0.44), dec!(0.55)) },
        );
        controller.on_book_update(
            Venue::P,
            BookUpdate { instrument_id: "p1".to_string(), book: book("p1", dec!(0.36), dec!(0.63)) },
        );

        controller.tick().await;
        let second = controller.tick().await;
        assert_eq!(second, 0);
    }

    #[tokio::test]
    async fn test_with_global_cooldown_respects_custom_duration() {
        // Two independent pairs isolate the *global* cooldown from the fixed
        // 15s per-pair cooldown: pair A's execution sets both, but pair B
        // never enters its own per-pair cooldown, so once the short custom
        // global cooldown elapses, pair B alone should be free to execute.
        let venue_k = InMemoryVenueClient::new(Venue::K);
        let venue_p = InMemoryVenueClient::new(Venue::P);
        let book_cache = Arc::new(BookCache::new());
        let risk_gate = Arc::new(RiskGate::new(dec!(1000), RiskConfig::default()));
        let detector = Arc::new(CrossExchangeDetector::new());
        let executor = Arc::new(CrossExecutor::new(
            venue_k.clone() as Arc<dyn VenueClient>,
            venue_p.clone() as Arc<dyn VenueClient>,
            book_cache.clone(),
            risk_gate.clone(),
        ));
        let (event_log, _handle) = EventLog::connect("sqlite::memory:").await.unwrap();
        let controller = Controller::with_global_cooldown(
            venue_k.clone() as Arc<dyn VenueClient>,
            venue_p.clone() as Arc<dyn VenueClient>,
            book_cache,
            risk_gate,
            detector,
            executor,
            Arc::new(event_log),
            Duration::from_millis(10),
        );

        venue_k.set_discoverable(vec![
            event(Venue::K, "k1", "BTC up or down 3pm", 900),
            event(Venue::K, "k2", "ETH up or down 3pm", 900),
        ]);
        venue_p.set_discoverable(vec![
            event(Venue::P, "p1", "BTC up or down 3pm", 900),
            event(Venue::P, "p2", "ETH up or down 3pm", 900),
        ]);
        venue_p.set_book("p1", book("p1", dec!(0.36), dec!(0.63)));
        venue_p.set_book("p2", book("p2", dec!(0.36), dec!(0.63)));
        venue_k.set_balance(Some(dec!(1000)));
        venue_k.set_next_fill_script(ScriptedFill::ImmediateFill);
        venue_p.set_next_fill_script(ScriptedFill::ImmediateFill);
        controller.discover().await.unwrap();

        controller.on_book_update(
            Venue::K,
            BookUpdate { instrument_id: "k1".to_string(), book: book("k1", dec!(0.44), dec!(0.55)) },
        );
        controller.on_book_update(
            Venue::P,
            BookUpdate { instrument_id: "p1".to_string(), book: book("p1", dec!(0.36), dec!(0.63)) },
        );
        assert_eq!(controller.tick().await, 1, "pair A executes");

        controller.on_book_update(
            Venue::K,
            BookUpdate { instrument_id: "k2".to_string(), book: book("k2", dec!(0.44), dec!(0.55)) },
        );
        controller.on_book_update(
            Venue::P,
            BookUpdate { instrument_id: "p2".to_string(), book: book("p2", dec!(0.36), dec!(0.63)) },
        );
        assert_eq!(controller.tick().await, 0, "still inside the 10ms global cooldown");

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(
            controller.tick().await,
            1,
            "global cooldown elapsed; pair B has no per-pair cooldown of its own"
        );
    }
}
