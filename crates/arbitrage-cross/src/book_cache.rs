//! Freshest top-of-book per `(venue, instrumentId)`.
//!
//! The only writer for a given instrument is its stream reader; Detector and
//! Executor only read. A read enforces a strict freshness policy rather than
//! ever handing back a stale book silently — the hot detection path treats
//! staleness as "no signal", while the Executor falls back to a REST call.

use algo_trade_core::error::ErrorKind;
use algo_trade_core::venue_client::{OrderBook, Venue};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;

/// Default freshness window, matching the subscription heartbeat on both
/// venues. Overridable via `ControllerConfig::book_freshness_ms`.
pub const FRESHNESS_WINDOW: Duration = Duration::from_millis(500);

pub struct BookCache {
    books: RwLock<HashMap<(Venue, String), OrderBook>>,
    freshness_window: Duration,
}

impl BookCache {
    #[must_use]
    pub fn new() -> Self {
        Self::with_freshness_window(FRESHNESS_WINDOW)
    }

    #[must_use]
    pub fn with_freshness_window(freshness_window: Duration) -> Self {
        Self {
            books: RwLock::new(HashMap::new()),
            freshness_window,
        }
    }

    /// Applies a book update in receive order. Out-of-order deltas (an
    /// update older than what's already cached) are discarded.
    pub fn update(&self, venue: Venue, book: OrderBook) {
        let key = (venue, book.instrument_id.clone());
        let mut books = self.books.write();
        if let Some(existing) = books.get(&key) {
            if book.updated_at < existing.updated_at {
                return;
            }
        }
        books.insert(key, book);
    }

    /// Returns the cached book only if it's within this cache's freshness
    /// window of now; otherwise `Stale`. A missing entry is `None`, not an
    /// error.
    pub fn get(&self, venue: Venue, instrument_id: &str) -> Result<Option<OrderBook>, ErrorKind> {
        let books = self.books.read();
        let Some(book) = books.get(&(venue, instrument_id.to_string())) else {
            return Ok(None);
        };
        if book.is_fresh(Utc::now(), self.freshness_window) {
            Ok(Some(book.clone()))
        } else {
            Err(ErrorKind::Stale(format!(
                "{venue}:{instrument_id} book is {}ms old",
                (Utc::now() - book.updated_at).num_milliseconds()
            )))
        }
    }

    /// Drops a cached book, e.g. when Controller unsubscribes the
    /// instrument.
    pub fn evict(&self, venue: Venue, instrument_id: &str) {
        self.books.write().remove(&(venue, instrument_id.to_string()));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.books.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.books.read().is_empty()
    }
}

impl Default for BookCache {
    fn default() -> Self {
        Self::new()
    }
}
