//! Polymarket CLOB integration for the cross-venue arbitrage bot.
//!
//! This crate provides:
//! - REST client with rate limiting for Polymarket's CLOB API
//! - Gamma API client for market discovery
//! - Models for markets, tokens, and prices
//! - A websocket client for top-of-book and order book streaming
//! - Order book modeling and order execution primitives (the `arbitrage` module)
//!
//! # Example
//!
//! ```no_run
//! use algo_trade_polymarket::{PolymarketClient, GammaClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let gamma = GammaClient::new();
//!     let markets = gamma.get_all_current_15min_markets().await;
//!     println!("Discovered {} 15-min markets", markets.len());
//!
//!     let client = PolymarketClient::new();
//!     let tradeable = client.discover_tradeable_btc_markets().await?;
//!     println!("Discovered {} tradeable markets", tradeable.len());
//!
//!     Ok(())
//! }
//! ```

pub mod arbitrage;
pub mod client;
pub mod gamma;
pub mod models;
pub mod venue_client;
pub mod websocket;

// Re-export main types
pub use client::PolymarketClient;
pub use gamma::GammaClient;
pub use models::{Coin, GammaEvent, GammaMarket, Market, MarketFilter, Price, Token};
pub use venue_client::PolymarketVenueClient;
pub use websocket::{BookEvent, PolymarketWebSocket, WebSocketConfig, WebSocketError};
