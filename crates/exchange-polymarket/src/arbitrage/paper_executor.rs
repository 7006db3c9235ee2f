//! Simulated order execution for `simulationMode`.
//!
//! Implements [`PolymarketExecutor`] entirely in memory, so the bot can run
//! its full discovery → detect → execute loop without signing or submitting
//! a single real order. Fills are deterministic in `always_fill` mode and
//! probabilistic otherwise, which lets tests exercise the partial-fill and
//! rejection paths the live path would also have to handle.

use super::execution::{ExecutionError, OrderParams, OrderResult, OrderStatus, PolymarketExecutor, Position};
use async_trait::async_trait;
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperExecutorConfig {
    pub initial_balance: Decimal,
    /// Probability that a submitted order fills at all.
    pub fill_rate: f64,
    /// Given a fill, probability that it is only partial.
    pub partial_fill_rate: f64,
    pub random_seed: Option<u64>,
}

impl Default for PaperExecutorConfig {
    fn default() -> Self {
        Self {
            initial_balance: dec!(1000),
            fill_rate: 0.95,
            partial_fill_rate: 0.05,
            random_seed: None,
        }
    }
}

impl PaperExecutorConfig {
    #[must_use]
    pub fn always_fill() -> Self {
        Self {
            fill_rate: 1.0,
            partial_fill_rate: 0.0,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn never_fill() -> Self {
        Self {
            fill_rate: 0.0,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }
}

struct PaperState {
    balance: Decimal,
    positions: HashMap<String, Position>,
    orders: HashMap<String, OrderResult>,
}

/// Paper-trading implementation of [`PolymarketExecutor`].
pub struct PaperExecutor {
    config: PaperExecutorConfig,
    state: Arc<RwLock<PaperState>>,
    rng: Arc<RwLock<StdRng>>,
}

impl PaperExecutor {
    #[must_use]
    pub fn new(config: PaperExecutorConfig) -> Self {
        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            state: Arc::new(RwLock::new(PaperState {
                balance: config.initial_balance,
                positions: HashMap::new(),
                orders: HashMap::new(),
            })),
            rng: Arc::new(RwLock::new(rng)),
            config,
        }
    }
}

#[async_trait]
impl PolymarketExecutor for PaperExecutor {
    async fn submit_order(&self, order: OrderParams) -> Result<OrderResult, ExecutionError> {
        let notional = order.notional_value();
        let order_id = Uuid::new_v4().to_string();

        let mut state = self.state.write();
        if state.balance < notional {
            let result = OrderResult::rejected(order_id.clone(), "insufficient paper balance");
            state.orders.insert(order_id, result.clone());
            return Ok(result);
        }

        let (fills, partial) = {
            let mut rng = self.rng.write();
            let fills = rng.gen_bool(self.config.fill_rate.clamp(0.0, 1.0));
            let partial = fills && rng.gen_bool(self.config.partial_fill_rate.clamp(0.0, 1.0));
            (fills, partial)
        };

        if !fills {
            let result = OrderResult::rejected(order_id.clone(), "simulated no-fill");
            state.orders.insert(order_id, result.clone());
            return Ok(result);
        }

        let filled_size = if partial {
            let pct = {
                let mut rng = self.rng.write();
                rng.gen_range(0.25..0.95)
            };
            order.size * Decimal::try_from(pct).unwrap_or(dec!(0.5))
        } else {
            order.size
        };

        state.balance -= order.price * filled_size;
        let position = state
            .positions
            .entry(order.token_id.clone())
            .or_insert_with(|| Position::new(order.token_id.clone(), Decimal::ZERO, order.price));
        position.size += filled_size;

        let result = OrderResult {
            order_id: order_id.clone(),
            status: if partial {
                OrderStatus::PartiallyFilled
            } else {
                OrderStatus::Filled
            },
            filled_size,
            avg_fill_price: Some(order.price),
            error: None,
        };
        state.orders.insert(order_id, result.clone());
        Ok(result)
    }

    async fn submit_orders_batch(
        &self,
        orders: Vec<OrderParams>,
    ) -> Result<Vec<OrderResult>, ExecutionError> {
        let mut results = Vec::with_capacity(orders.len());
        for order in orders {
            results.push(self.submit_order(order).await?);
        }
        Ok(results)
    }

    async fn cancel_order(&self, order_id: &str) -> Result<(), ExecutionError> {
        let mut state = self.state.write();
        match state.orders.get_mut(order_id) {
            Some(result) if !result.status.is_terminal() => {
                result.status = OrderStatus::Cancelled;
                Ok(())
            }
            Some(_) => Ok(()),
            None => Err(ExecutionError::Api(format!("unknown order {order_id}"))),
        }
    }

    async fn get_order_status(&self, order_id: &str) -> Result<OrderResult, ExecutionError> {
        self.state
            .read()
            .orders
            .get(order_id)
            .cloned()
            .ok_or_else(|| ExecutionError::Api(format!("unknown order {order_id}")))
    }

    async fn wait_for_terminal(
        &self,
        order_id: &str,
        _timeout: Duration,
    ) -> Result<OrderResult, ExecutionError> {
        self.get_order_status(order_id).await
    }

    async fn get_positions(&self) -> Result<Vec<Position>, ExecutionError> {
        Ok(self.state.read().positions.values().cloned().collect())
    }

    async fn get_balance(&self) -> Result<Decimal, ExecutionError> {
        Ok(self.state.read().balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_fill_config_fills_entire_size() {
        let executor = PaperExecutor::new(PaperExecutorConfig::always_fill());
        let order = OrderParams::buy_fok("token-1", dec!(0.45), dec!(100));
        let result = executor.submit_order(order).await.unwrap();
        assert_eq!(result.status, OrderStatus::Filled);
        assert_eq!(result.filled_size, dec!(100));
    }

    #[tokio::test]
    async fn never_fill_config_rejects_every_order() {
        let executor = PaperExecutor::new(PaperExecutorConfig::never_fill());
        let order = OrderParams::buy_fok("token-1", dec!(0.45), dec!(100));
        let result = executor.submit_order(order).await.unwrap();
        assert_eq!(result.status, OrderStatus::Rejected);
    }

    #[tokio::test]
    async fn insufficient_balance_rejects_without_touching_balance() {
        let executor = PaperExecutor::new(PaperExecutorConfig {
            initial_balance: dec!(1),
            ..PaperExecutorConfig::always_fill()
        });
        let order = OrderParams::buy_fok("token-1", dec!(0.45), dec!(100));
        let result = executor.submit_order(order).await.unwrap();
        assert_eq!(result.status, OrderStatus::Rejected);
        assert_eq!(executor.get_balance().await.unwrap(), dec!(1));
    }

    #[tokio::test]
    async fn cancel_is_idempotent_on_terminal_orders() {
        let executor = PaperExecutor::new(PaperExecutorConfig::always_fill());
        let order = OrderParams::buy_fok("token-1", dec!(0.45), dec!(100));
        let result = executor.submit_order(order).await.unwrap();
        executor.cancel_order(&result.order_id).await.unwrap();
        let status = executor.get_order_status(&result.order_id).await.unwrap();
        assert_eq!(status.status, OrderStatus::Filled);
    }
}
