//! Order book modeling and execution primitives for Polymarket's CLOB.
//!
//! # Modules
//!
//! - [`types`]: L2 order book and fill simulation types shared with the cross-venue arbitrage crate
//! - [`orderbook`]: order book walking and fill simulation helpers
//! - [`execution`]: order submission traits and types for the CLOB
//! - [`paper_executor`]: in-memory `PolymarketExecutor` used when `simulationMode` is on

pub mod execution;
pub mod orderbook;
pub mod paper_executor;
pub mod types;

pub use orderbook::{depth_at_price, price_impact, simulate_fill};
pub use paper_executor::{PaperExecutor, PaperExecutorConfig};
pub use types::{FillSimulation, L2OrderBook, OrderType, Side};

pub use execution::{
    ArbitragePositionSnapshot, ExecutionError, ExecutionResult, ExecutorConfig, OrderParams,
    OrderResult, OrderStatus, PolymarketExecutor, Position, RiskLimit,
};
