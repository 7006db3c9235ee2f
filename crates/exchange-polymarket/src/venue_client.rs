//! Adapts Polymarket's REST/websocket/execution primitives to the shared
//! [`algo_trade_core::VenueClient`] capability set.

use crate::arbitrage::execution::{
    ExecutionError, OrderParams as ExecOrderParams, OrderType as ExecOrderType,
    PolymarketExecutor, Side as ExecSide,
};
use crate::client::PolymarketClient;
use crate::gamma::GammaClient;
use crate::models::{Coin, Market};
use algo_trade_core::error::ErrorKind;
use algo_trade_core::venue_client::{
    BookUpdate, DiscoveryFilter, MarketEvent, MarketMetadata, OrderBook, OrderFillStatus,
    OrderState, OutcomeSide, PriceLevel, Venue, VenueClient,
};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Polymarket implementation of the shared venue capability set.
///
/// Order placement is delegated to a [`PolymarketExecutor`] so the Controller
/// can swap between a live EIP-712-signing executor and a simulator without
/// this adapter knowing the difference — matching `simulationMode`.
pub struct PolymarketVenueClient {
    rest: PolymarketClient,
    gamma: GammaClient,
    executor: Arc<dyn PolymarketExecutor>,
}

impl PolymarketVenueClient {
    #[must_use]
    pub fn new(rest: PolymarketClient, gamma: GammaClient, executor: Arc<dyn PolymarketExecutor>) -> Self {
        Self { rest, gamma, executor }
    }

    fn market_to_event(market: &Market) -> Option<MarketEvent> {
        let yes = market.yes_token()?;
        let no = market.no_token()?;
        Some(MarketEvent {
            venue: Venue::P,
            instrument_id: market.condition_id.clone(),
            venue_ticker: market.condition_id.clone(),
            title: market.question.clone(),
            resolution_time: market.end_date.unwrap_or_else(Utc::now),
            yes_ask: Some(yes.price),
            no_ask: Some(no.price),
            cumulative_volume: market.volume_24h.unwrap_or_default(),
            resolution_source: "polymarket".to_string(),
            metadata: MarketMetadata::Polymarket {
                yes_token_id: yes.token_id.clone(),
                no_token_id: no.token_id.clone(),
                neg_risk: true,
            },
        })
    }
}

fn map_execution_error(err: ExecutionError) -> ErrorKind {
    match err {
        ExecutionError::Rejected { reason } => ErrorKind::BadPrice(reason),
        ExecutionError::InsufficientBalance { required, available } => ErrorKind::NoLiquidity(
            format!("insufficient balance: need {required}, have {available}"),
        ),
        ExecutionError::Timeout { order_id } => {
            ErrorKind::Transient(format!("timed out waiting for order {order_id}"))
        }
        ExecutionError::PartialFill { order_id, filled, requested } => ErrorKind::PartialFill(
            format!("order {order_id} filled {filled} of {requested}"),
        ),
        ExecutionError::Api(msg) => ErrorKind::Transient(msg),
        other => ErrorKind::Transient(other.to_string()),
    }
}

#[async_trait]
impl VenueClient for PolymarketVenueClient {
    async fn discover(&self, filter: &DiscoveryFilter) -> Result<Vec<MarketEvent>, ErrorKind> {
        if filter.asset_keywords.is_empty() {
            let markets = self
                .gamma
                .get_all_current_15min_markets()
                .await;
            return Ok(markets.iter().filter_map(Self::market_to_event).collect());
        }

        let coins: Vec<Coin> = Coin::all()
            .iter()
            .copied()
            .filter(|c| {
                filter
                    .asset_keywords
                    .iter()
                    .any(|kw| kw.eq_ignore_ascii_case(c.slug_prefix()))
            })
            .collect();

        if !coins.is_empty() {
            let markets = self.gamma.get_15min_markets_for_coins(&coins).await;
            return Ok(markets.iter().filter_map(Self::market_to_event).collect());
        }

        let keywords: Vec<&str> = filter.asset_keywords.iter().map(String::as_str).collect();
        let markets = self
            .rest
            .discover_markets_by_keywords(&keywords)
            .await
            .map_err(|e| ErrorKind::Transient(e.to_string()))?;
        Ok(markets.iter().filter_map(Self::market_to_event).collect())
    }

    async fn refresh(&self, instrument_id: &str) -> Result<Option<MarketEvent>, ErrorKind> {
        match self.rest.get_market(instrument_id).await {
            Ok(market) => Ok(Self::market_to_event(&market)),
            Err(err) => Err(ErrorKind::Transient(err.to_string())),
        }
    }

    async fn subscribe(
        &self,
        instrument_ids: &[String],
    ) -> Result<tokio::sync::mpsc::Receiver<BookUpdate>, ErrorKind> {
        use crate::websocket::{BookEvent, PolymarketWebSocket, WebSocketConfig};

        let (ws, mut events) = PolymarketWebSocket::connect(instrument_ids.to_vec(), WebSocketConfig::default())
            .await
            .map_err(|e| ErrorKind::Transient(e.to_string()))?;

        let (tx, rx) = tokio::sync::mpsc::channel(1000);
        tokio::spawn(async move {
            let _ws = ws;
            while let Some(event) = events.recv().await {
                let (instrument_id, book) = match event {
                    BookEvent::Snapshot { asset_id, book } => (asset_id, book),
                    _ => continue,
                };
                let yes_bid = book.best_bid().map(|price| PriceLevel {
                    price,
                    size: book.bids.get(&std::cmp::Reverse(price)).copied().unwrap_or_default(),
                });
                let yes_ask = book.best_ask().map(|price| PriceLevel {
                    price,
                    size: book.asks.get(&price).copied().unwrap_or_default(),
                });
                let update = BookUpdate {
                    instrument_id: instrument_id.clone(),
                    book: OrderBook {
                        instrument_id,
                        yes_bid,
                        yes_ask,
                        no_bid: None,
                        no_ask: None,
                        updated_at: Utc::now(),
                    },
                };
                if tx.send(update).await.is_err() {
                    break;
                }
            }
        });

        Ok(rx)
    }

    async fn top_of_book(&self, instrument_id: &str) -> Result<Option<OrderBook>, ErrorKind> {
        let market = match self.rest.get_market(instrument_id).await {
            Ok(m) => m,
            Err(err) => return Err(ErrorKind::Transient(err.to_string())),
        };
        let Some(yes) = market.yes_price() else {
            return Ok(None);
        };
        let no = market.no_price();
        Ok(Some(OrderBook {
            instrument_id: instrument_id.to_string(),
            yes_bid: None,
            yes_ask: Some(PriceLevel { price: yes, size: Decimal::ZERO }),
            no_bid: None,
            no_ask: no.map(|p| PriceLevel { price: p, size: Decimal::ZERO }),
            updated_at: Utc::now(),
        }))
    }

    async fn balance(&self) -> Result<Option<Decimal>, ErrorKind> {
        self.executor
            .get_balance()
            .await
            .map(Some)
            .map_err(map_execution_error)
    }

    async fn place_order(
        &self,
        _instrument_id: &str,
        side: OutcomeSide,
        size: Decimal,
        limit_price: Decimal,
        metadata: &MarketMetadata,
    ) -> Result<String, ErrorKind> {
        let MarketMetadata::Polymarket { yes_token_id, no_token_id, neg_risk } = metadata else {
            return Err(ErrorKind::BadPrice("missing polymarket token metadata".to_string()));
        };
        let token_id = match side {
            OutcomeSide::Yes => yes_token_id,
            OutcomeSide::No => no_token_id,
        };
        let order = ExecOrderParams {
            token_id: token_id.clone(),
            side: ExecSide::Buy,
            price: limit_price,
            size,
            order_type: ExecOrderType::Fok,
            neg_risk: *neg_risk,
        };
        self.executor
            .submit_order(order)
            .await
            .map(|result| result.order_id)
            .map_err(map_execution_error)
    }

    async fn query_order(&self, order_id: &str) -> Result<OrderState, ErrorKind> {
        let result = self
            .executor
            .get_order_status(order_id)
            .await
            .map_err(map_execution_error)?;
        Ok(OrderState {
            status: match result.status {
                crate::arbitrage::execution::OrderStatus::Pending => OrderFillStatus::Pending,
                crate::arbitrage::execution::OrderStatus::PartiallyFilled => {
                    OrderFillStatus::PartiallyFilled
                }
                crate::arbitrage::execution::OrderStatus::Filled => OrderFillStatus::Filled,
                crate::arbitrage::execution::OrderStatus::Cancelled => OrderFillStatus::Cancelled,
                crate::arbitrage::execution::OrderStatus::Rejected
                | crate::arbitrage::execution::OrderStatus::Expired => OrderFillStatus::Rejected,
            },
            filled_size: result.filled_size,
        })
    }

    async fn cancel_order(&self, order_id: &str) -> Result<(), ErrorKind> {
        self.executor
            .cancel_order(order_id)
            .await
            .map_err(map_execution_error)
    }

    fn venue(&self) -> Venue {
        Venue::P
    }
}
