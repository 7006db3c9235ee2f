//! In-memory `VenueClient` test double.
//!
//! A scripted venue that replays a fixed sequence of book snapshots and
//! order outcomes. Used by every crate's tests that need a `VenueClient`
//! without a real network connection. Never wired into the live Controller.

use crate::error::ErrorKind;
use crate::venue_client::{
    BookUpdate, DiscoveryFilter, MarketEvent, MarketMetadata, OrderBook, OrderFillStatus,
    OrderState, OutcomeSide, Venue, VenueClient,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Scripted outcome for a single `place_order` + `query_order` sequence.
#[derive(Debug, Clone)]
pub enum ScriptedFill {
    /// The order reports filled on the first poll.
    ImmediateFill,
    /// The order reports `Pending` for `pending_polls` queries, then fills.
    DelayedFill { pending_polls: u32 },
    /// The order never fills; stays `Pending` forever (until cancelled).
    NeverFills,
    /// The order reports `PartiallyFilled` with `filled_size`, then stays there.
    PartialFill { filled_size: Decimal },
    /// `place_order` itself returns this error.
    RejectPlacement(String),
}

struct OrderRecord {
    status: OrderFillStatus,
    filled_size: Decimal,
    requested_size: Decimal,
    poll_count: u32,
    script: ScriptedFill,
    cancelled: bool,
}

/// In-memory, fully deterministic `VenueClient`.
pub struct InMemoryVenueClient {
    venue: Venue,
    events: Mutex<Vec<MarketEvent>>,
    books: Mutex<HashMap<String, OrderBook>>,
    balance: Mutex<Option<Decimal>>,
    next_fill_script: Mutex<ScriptedFill>,
    orders: Mutex<HashMap<String, OrderRecord>>,
    next_order_id: AtomicU64,
    subscribe_tx: Mutex<Option<tokio::sync::mpsc::Sender<BookUpdate>>>,
}

impl InMemoryVenueClient {
    #[must_use]
    pub fn new(venue: Venue) -> Arc<Self> {
        Arc::new(Self {
            venue,
            events: Mutex::new(Vec::new()),
            books: Mutex::new(HashMap::new()),
            balance: Mutex::new(Some(Decimal::new(100, 0))),
            next_fill_script: Mutex::new(ScriptedFill::ImmediateFill),
            orders: Mutex::new(HashMap::new()),
            next_order_id: AtomicU64::new(1),
            subscribe_tx: Mutex::new(None),
        })
    }

    pub fn set_discoverable(&self, events: Vec<MarketEvent>) {
        *self.events.lock() = events;
    }

    pub fn set_book(&self, instrument_id: &str, book: OrderBook) {
        self.books.lock().insert(instrument_id.to_string(), book);
    }

    pub fn set_balance(&self, balance: Option<Decimal>) {
        *self.balance.lock() = balance;
    }

    /// Sets the script the *next* `place_order` call will follow.
    pub fn set_next_fill_script(&self, script: ScriptedFill) {
        *self.next_fill_script.lock() = script;
    }

    /// Pushes a book update through an open `subscribe` stream, if any.
    pub async fn push_update(&self, update: BookUpdate) {
        let tx = self.subscribe_tx.lock().clone();
        if let Some(tx) = tx {
            let _ = tx.send(update).await;
        }
    }
}

#[async_trait]
impl VenueClient for InMemoryVenueClient {
    async fn discover(&self, filter: &DiscoveryFilter) -> Result<Vec<MarketEvent>, ErrorKind> {
        let events = self.events.lock().clone();
        if filter.asset_keywords.is_empty() {
            return Ok(events);
        }
        Ok(events
            .into_iter()
            .filter(|e| {
                filter.asset_keywords.iter().any(|kw| {
                    e.title.to_lowercase().contains(&kw.to_lowercase())
                })
            })
            .collect())
    }

    async fn refresh(&self, instrument_id: &str) -> Result<Option<MarketEvent>, ErrorKind> {
        Ok(self
            .events
            .lock()
            .iter()
            .find(|e| e.instrument_id == instrument_id)
            .cloned())
    }

    async fn subscribe(
        &self,
        _instrument_ids: &[String],
    ) -> Result<tokio::sync::mpsc::Receiver<BookUpdate>, ErrorKind> {
        let (tx, rx) = tokio::sync::mpsc::channel(64);
        *self.subscribe_tx.lock() = Some(tx);
        Ok(rx)
    }

    async fn top_of_book(&self, instrument_id: &str) -> Result<Option<OrderBook>, ErrorKind> {
        Ok(self.books.lock().get(instrument_id).cloned())
    }

    async fn balance(&self) -> Result<Option<Decimal>, ErrorKind> {
        Ok(*self.balance.lock())
    }

    async fn place_order(
        &self,
        _instrument_id: &str,
        _side: OutcomeSide,
        size: Decimal,
        _limit_price: Decimal,
        _metadata: &MarketMetadata,
    ) -> Result<String, ErrorKind> {
        let script = self.next_fill_script.lock().clone();
        if let ScriptedFill::RejectPlacement(reason) = &script {
            return Err(ErrorKind::Transient(reason.clone()));
        }
        let id = format!("{}-{}", self.venue, self.next_order_id.fetch_add(1, Ordering::SeqCst));
        self.orders.lock().insert(
            id.clone(),
            OrderRecord {
                status: OrderFillStatus::Pending,
                filled_size: Decimal::ZERO,
                requested_size: size,
                poll_count: 0,
                script,
                cancelled: false,
            },
        );
        Ok(id)
    }

    async fn query_order(&self, order_id: &str) -> Result<OrderState, ErrorKind> {
        let mut orders = self.orders.lock();
        let order = orders
            .get_mut(order_id)
            .ok_or_else(|| ErrorKind::Transient(format!("unknown order {order_id}")))?;

        if order.cancelled {
            return Ok(OrderState {
                status: OrderFillStatus::Cancelled,
                filled_size: order.filled_size,
            });
        }

        order.poll_count += 1;
        match &order.script {
            ScriptedFill::ImmediateFill => {
                order.status = OrderFillStatus::Filled;
                order.filled_size = order.requested_size;
            }
            ScriptedFill::DelayedFill { pending_polls } => {
                if order.poll_count > *pending_polls {
                    order.status = OrderFillStatus::Filled;
                    order.filled_size = order.requested_size;
                }
            }
            ScriptedFill::NeverFills => {}
            ScriptedFill::PartialFill { filled_size } => {
                order.status = OrderFillStatus::PartiallyFilled;
                order.filled_size = *filled_size;
            }
            ScriptedFill::RejectPlacement(_) => unreachable!("rejected orders are never stored"),
        }

        Ok(OrderState {
            status: order.status,
            filled_size: order.filled_size,
        })
    }

    async fn cancel_order(&self, order_id: &str) -> Result<(), ErrorKind> {
        let mut orders = self.orders.lock();
        let order = orders
            .get_mut(order_id)
            .ok_or_else(|| ErrorKind::Transient(format!("unknown order {order_id}")))?;
        order.cancelled = true;
        Ok(())
    }

    fn venue(&self) -> Venue {
        self.venue
    }
}
