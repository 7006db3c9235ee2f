use std::sync::Arc;

use algo_trade_arbitrage_cross::{BookCache, Controller, CrossExchangeDetector, CrossExecutor, EventLog, RiskGate};
use algo_trade_core::config::RiskConfig;
use algo_trade_core::test_support::InMemoryVenueClient;
use algo_trade_core::venue_client::{MarketEvent, MarketMetadata, OrderBook, PriceLevel, Venue, VenueClient};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn matched_event(venue: Venue, id: &str) -> MarketEvent {
    MarketEvent {
        venue,
        instrument_id: id.to_string(),
        venue_ticker: id.to_string(),
        title: "BTC above $100k at 3pm".to_string(),
        resolution_time: Utc::now() + chrono::Duration::minutes(15),
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

/// Wires the same components `main.rs` wires, against the in-memory venue
/// doubles instead of real Kalshi/Polymarket clients, and runs one
/// discover + tick cycle end to end.
#[tokio::test]
async fn discover_and_execute_against_in_memory_venues() {
    let venue_k = InMemoryVenueClient::new(Venue::K);
    let venue_p = InMemoryVenueClient::new(Venue::P);
    venue_k.set_discoverable(vec![matched_event(Venue::K, "k1")]);
    venue_p.set_discoverable(vec![matched_event(Venue::P, "p1")]);
    venue_p.set_book("p1", book("p1", dec!(0.36), dec!(0.63)));
    venue_k.set_balance(Some(dec!(1000)));
    venue_p.set_balance(Some(dec!(1000)));

    let book_cache = Arc::new(BookCache::new());
    let risk_gate = Arc::new(RiskGate::new(dec!(1000), RiskConfig::default()));
    let detector = Arc::new(CrossExchangeDetector::new());
    let executor = Arc::new(CrossExecutor::new(
        venue_k.clone() as Arc<dyn VenueClient>,
        venue_p.clone() as Arc<dyn VenueClient>,
        book_cache.clone(),
        risk_gate.clone(),
    ));
    let (event_log, writer_handle) = EventLog::connect("sqlite::memory:").await.unwrap();

    let controller = Controller::new(
        venue_k.clone() as Arc<dyn VenueClient>,
        venue_p.clone() as Arc<dyn VenueClient>,
        book_cache.clone(),
        risk_gate,
        detector,
        executor,
        Arc::new(event_log),
    );

    let added = controller.discover().await.expect("discovery pass");
    assert_eq!(added, 1, "should match the single K/P pair");
    assert_eq!(controller.active_pair_count(), 1);

    book_cache.update(Venue::K, book("k1", dec!(0.44), dec!(0.55)));
    book_cache.update(Venue::P, book("p1", dec!(0.36), dec!(0.63)));

    let attempts = controller.tick().await;
    assert_eq!(attempts, 1, "the clear arbitrage scenario should trigger exactly one execution attempt");

    drop(controller);
    tokio::time::timeout(std::time::Duration::from_secs(2), writer_handle)
        .await
        .expect("event log writer should drain promptly after the controller drops its handle")
        .unwrap();
}
