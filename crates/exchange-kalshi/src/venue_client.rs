//! Adapts Kalshi's REST client and order executor to the shared
//! [`algo_trade_core::VenueClient`] capability set.
//!
//! Kalshi exposes no public websocket feed in this crate, so `subscribe`
//! polls `get_orderbook` on an interval and pushes updates onto the
//! returned channel; callers cannot tell the difference from a true push
//! feed except for latency.

use crate::client::KalshiClient;
use crate::executor::KalshiExecutor;
use crate::types::{Action, Market, OrderRequest, OrderStatus as KalshiOrderStatus, Side as KalshiSide};
use algo_trade_core::error::ErrorKind;
use algo_trade_core::venue_client::{
    BookUpdate, DiscoveryFilter, MarketEvent, MarketMetadata, OrderBook, OrderFillStatus,
    OrderState, OutcomeSide, PriceLevel, Venue, VenueClient,
};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

/// Interval on which `subscribe` re-polls each ticker's order book.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct KalshiVenueClient {
    client: Arc<KalshiClient>,
    executor: Arc<KalshiExecutor>,
}

impl KalshiVenueClient {
    #[must_use]
    pub fn new(client: Arc<KalshiClient>, executor: Arc<KalshiExecutor>) -> Self {
        Self { client, executor }
    }

    fn cents_to_probability(cents: Decimal) -> Decimal {
        cents / Decimal::from(100)
    }

    fn market_to_event(market: &Market) -> Option<MarketEvent> {
        Some(MarketEvent {
            venue: Venue::K,
            instrument_id: market.ticker.clone(),
            venue_ticker: market.ticker.clone(),
            title: market.title.clone(),
            resolution_time: market.expiration_time.or(market.close_time).unwrap_or_else(Utc::now),
            yes_ask: market.yes_ask.map(Self::cents_to_probability),
            no_ask: market.no_ask.map(Self::cents_to_probability),
            cumulative_volume: market
                .volume_24h
                .map(Decimal::from)
                .unwrap_or_default(),
            resolution_source: market.category.clone().unwrap_or_default(),
            metadata: MarketMetadata::Kalshi,
        })
    }
}

fn map_kalshi_error(err: crate::error::KalshiError) -> ErrorKind {
    use crate::error::KalshiError;
    match &err {
        KalshiError::Network(_) | KalshiError::Timeout(_) | KalshiError::RateLimit { .. } => {
            ErrorKind::Transient(err.to_string())
        }
        KalshiError::Api { status_code, .. } if *status_code >= 500 => {
            ErrorKind::Transient(err.to_string())
        }
        KalshiError::InsufficientBalance { .. } => ErrorKind::NoLiquidity(err.to_string()),
        KalshiError::InvalidOrder(_) => ErrorKind::BadPrice(err.to_string()),
        KalshiError::OrderRejected(_) => ErrorKind::BadPrice(err.to_string()),
        KalshiError::Authentication(_) | KalshiError::Signing(_) => {
            ErrorKind::AuthFailure(err.to_string())
        }
        KalshiError::Configuration(_) => ErrorKind::ConfigInvalid(err.to_string()),
        KalshiError::CircuitBreakerOpen { .. } => ErrorKind::KillSwitch(err.to_string()),
        _ => ErrorKind::Transient(err.to_string()),
    }
}

#[async_trait]
impl VenueClient for KalshiVenueClient {
    async fn discover(&self, filter: &DiscoveryFilter) -> Result<Vec<MarketEvent>, ErrorKind> {
        let markets = if filter.asset_keywords.is_empty() {
            self.client.get_markets(None).await.map_err(map_kalshi_error)?
        } else {
            let keywords: Vec<&str> = filter.asset_keywords.iter().map(String::as_str).collect();
            self.client
                .discover_markets_by_keywords(&keywords)
                .await
                .map_err(map_kalshi_error)?
        };
        Ok(markets.iter().filter_map(Self::market_to_event).collect())
    }

    async fn refresh(&self, instrument_id: &str) -> Result<Option<MarketEvent>, ErrorKind> {
        match self.client.get_market(instrument_id).await {
            Ok(market) => Ok(Self::market_to_event(&market)),
            Err(crate::error::KalshiError::MarketNotFound { .. }) => Ok(None),
            Err(err) => Err(map_kalshi_error(err)),
        }
    }

    async fn subscribe(
        &self,
        instrument_ids: &[String],
    ) -> Result<tokio::sync::mpsc::Receiver<BookUpdate>, ErrorKind> {
        let (tx, rx) = tokio::sync::mpsc::channel(1000);
        let client = Arc::clone(&self.client);
        let tickers = instrument_ids.to_vec();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(POLL_INTERVAL);
            loop {
                interval.tick().await;
                for ticker in &tickers {
                    let Ok(book) = client.get_orderbook(ticker, 10).await else {
                        continue;
                    };
                    let update = BookUpdate {
                        instrument_id: ticker.clone(),
                        book: OrderBook {
                            instrument_id: ticker.clone(),
                            yes_bid: book.best_yes_bid().map(|c| PriceLevel {
                                price: Decimal::from(c) / Decimal::from(100),
                                size: Decimal::from(book.yes_bid_depth()),
                            }),
                            yes_ask: book.best_yes_ask().map(|c| PriceLevel {
                                price: Decimal::from(c) / Decimal::from(100),
                                size: Decimal::from(book.yes_ask_depth()),
                            }),
                            no_bid: book.best_no_bid().map(|c| PriceLevel {
                                price: Decimal::from(c) / Decimal::from(100),
                                size: Decimal::from(book.yes_ask_depth()),
                            }),
                            no_ask: book.best_no_ask().map(|c| PriceLevel {
                                price: Decimal::from(c) / Decimal::from(100),
                                size: Decimal::from(book.yes_bid_depth()),
                            }),
                            updated_at: Utc::now(),
                        },
                    };
                    if tx.send(update).await.is_err() {
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn top_of_book(&self, instrument_id: &str) -> Result<Option<OrderBook>, ErrorKind> {
        let book = match self.client.get_orderbook(instrument_id, 10).await {
            Ok(b) => b,
            Err(crate::error::KalshiError::MarketNotFound { .. }) => return Ok(None),
            Err(err) => return Err(map_kalshi_error(err)),
        };
        Ok(Some(OrderBook {
            instrument_id: instrument_id.to_string(),
            yes_bid: book.best_yes_bid().map(|c| PriceLevel {
                price: Decimal::from(c) / Decimal::from(100),
                size: Decimal::from(book.yes_bid_depth()),
            }),
            yes_ask: book.best_yes_ask().map(|c| PriceLevel {
                price: Decimal::from(c) / Decimal::from(100),
                size: Decimal::from(book.yes_ask_depth()),
            }),
            no_bid: book.best_no_bid().map(|c| PriceLevel {
                price: Decimal::from(c) / Decimal::from(100),
                size: Decimal::from(book.yes_ask_depth()),
            }),
            no_ask: book.best_no_ask().map(|c| PriceLevel {
                price: Decimal::from(c) / Decimal::from(100),
                size: Decimal::from(book.yes_bid_depth()),
            }),
            updated_at: Utc::now(),
        }))
    }

    async fn balance(&self) -> Result<Option<Decimal>, ErrorKind> {
        let balance = self.executor.refresh_balance().await.map_err(map_kalshi_error)?;
        Ok(Some(Decimal::from(balance.available_balance) / Decimal::from(100)))
    }

    async fn place_order(
        &self,
        instrument_id: &str,
        side: OutcomeSide,
        size: Decimal,
        limit_price: Decimal,
        _metadata: &MarketMetadata,
    ) -> Result<String, ErrorKind> {
        let price_cents = (limit_price * Decimal::from(100))
            .round()
            .to_string()
            .parse::<u32>()
            .map_err(|_| ErrorKind::BadPrice(format!("invalid limit price {limit_price}")))?;
        let count: u32 = size
            .round()
            .to_string()
            .parse()
            .map_err(|_| ErrorKind::BadPrice(format!("invalid order size {size}")))?;

        let order = match side {
            OutcomeSide::Yes => OrderRequest::buy_yes(instrument_id, price_cents, count),
            OutcomeSide::No => OrderRequest::buy_no(instrument_id, price_cents, count),
        };
        debug_assert_eq!(order.action, Action::Buy);
        debug_assert_eq!(
            order.side,
            match side {
                OutcomeSide::Yes => KalshiSide::Yes,
                OutcomeSide::No => KalshiSide::No,
            }
        );

        let result = self.executor.execute_order(&order).await.map_err(map_kalshi_error)?;
        Ok(result.order_id)
    }

    async fn query_order(&self, order_id: &str) -> Result<OrderState, ErrorKind> {
        let order = self.executor.get_order(order_id).await.map_err(map_kalshi_error)?;
        Ok(OrderState {
            status: match order.status {
                KalshiOrderStatus::Pending | KalshiOrderStatus::Resting => OrderFillStatus::Pending,
                KalshiOrderStatus::PartialFilled => OrderFillStatus::PartiallyFilled,
                KalshiOrderStatus::Filled => OrderFillStatus::Filled,
                KalshiOrderStatus::Cancelled => OrderFillStatus::Cancelled,
                KalshiOrderStatus::Rejected => OrderFillStatus::Rejected,
            },
            filled_size: Decimal::from(order.filled_count),
        })
    }

    async fn cancel_order(&self, order_id: &str) -> Result<(), ErrorKind> {
        self.executor.cancel_order(order_id).await.map_err(map_kalshi_error)
    }

    fn venue(&self) -> Venue {
        Venue::K
    }
}
