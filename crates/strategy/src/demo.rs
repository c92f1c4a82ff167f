//! Smoke-test strategy: queries account and position state, then places a
//! minimal market order on the configured perpetual.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal_macros::dec;
use tracing::info;

use engine::{
    Account, Book, Component, Direction, Engine, Order, OrderItem, OrderType, Position, Tick,
};

use crate::base::{register_strategy_callbacks, Strategy};

pub struct DemoStrategy {
    engine: Arc<Engine>,
    symbol: String,
}

impl DemoStrategy {
    pub fn new(engine: Arc<Engine>, symbol: impl Into<String>) -> Self {
        Self { engine, symbol: symbol.into() }
    }
}

#[async_trait]
impl Component for DemoStrategy {
    fn name(&self) -> &str {
        "demo-strategy"
    }

    async fn init(self: Arc<Self>) -> Result<()> {
        register_strategy_callbacks(&self);
        Ok(())
    }

    async fn run(self: Arc<Self>) -> Result<()> {
        info!(symbol = %self.symbol, "demo strategy started");

        self.request_account().await?;
        self.request_position().await?;

        // give the gateway a moment to answer before trading
        tokio::time::sleep(Duration::from_secs(1)).await;

        let order = Order {
            items: vec![OrderItem {
                symbol: self.symbol.clone(),
                direction: Direction::Buy,
                order_type: OrderType::Market,
                volume: dec!(0.01),
                ..OrderItem::default()
            }],
            ..Order::default()
        };
        self.send_order(order).await?;
        Ok(())
    }
}

#[async_trait]
impl Strategy for DemoStrategy {
    fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    async fn recv_account(&self, account: &Account) -> Result<()> {
        info!(balance = %account.balance, currencies = account.items.len(), "account snapshot");
        Ok(())
    }

    async fn recv_position(&self, position: &Position) -> Result<()> {
        info!(positions = position.items.len(), "position snapshot");
        for item in &position.items {
            info!(
                symbol = %item.symbol,
                volume = %item.volume,
                price = %item.price,
                direction = ?item.direction,
                "position"
            );
        }
        Ok(())
    }

    async fn recv_book(&self, book: &Book) -> Result<()> {
        info!(symbol = %book.symbol, bids = book.bids.len(), asks = book.asks.len(), "book");
        Ok(())
    }

    async fn recv_tick(&self, tick: &Tick) -> Result<()> {
        info!(symbol = %tick.symbol, last = %tick.last_price, "tick");
        Ok(())
    }

    async fn recv_order(&self, order: &Order) -> Result<()> {
        info!(items = order.items.len(), "order update");
        Ok(())
    }
}
